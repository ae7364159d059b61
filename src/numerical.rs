//! # numerical
//! Schrödinger equation for V(y) = V0*(y² - 2y)/C: fixed-energy integration and the
//! shooting search for the energy eigenvalue.
//!
//! ```rust, ignore
//! use SchrodingerShooting::numerical::Schrodinger::fixed_energy::FixedEnergyTask;
//! let task = FixedEnergyTask::default();
//! let trajectory = task.solve()?;
//! task.plot(&trajectory, std::path::Path::new("results"))?;
//! ```
/// Potential, ODE system in y, fixed-energy integration
pub mod Schrodinger;
/// SOLVERS OF NON-STIFF IVP: adaptive Dormand-Prince 5(4) with dense output and fixed-step RK4
pub mod NonStiff_api;
/// Bisection shooting for the energy eigenvalue
pub mod ShootingBVP;
