/// potential V(y), the ODE system in y and the sampled trajectory type
pub mod potential;
/// one integration pass at a given energy, with plots in y and in x = -a*ln(y)
pub mod fixed_energy;
