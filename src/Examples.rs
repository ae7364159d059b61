//! examples of usage of SchrodingerShooting
/// fixed-energy and shooting runs
pub mod schrodinger_examples;
