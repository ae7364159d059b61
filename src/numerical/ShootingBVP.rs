/// bisection on a scalar residual with an explicit convergence status
pub mod bisection;
/// Dirichlet-Dirichlet shooting over the energy
pub mod Shooting_eigen;
