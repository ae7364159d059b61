//! Integration of the Schrödinger equation in y at a fixed, given energy.
//! One deterministic pass, no convergence criterion.
use crate::Utils::plots::{Figure, save_plot};
use crate::numerical::NonStiff_api::{IVPError, IVPOptions, linspace, solve_ivp};
use crate::numerical::Schrodinger::potential::{PotentialParams, Trajectory};
use log::info;
use nalgebra::DVector;
use plotters::style::{BLACK, BLUE, RED};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct FixedEnergyTask {
    pub params: PotentialParams,
    pub energy: f64,
    /// (psi, dpsi/dy) at the left end of the domain
    pub initial_state: (f64, f64),
    pub domain: (f64, f64),
    pub n_points: usize,
    pub ivp_options: IVPOptions,
}

impl Default for FixedEnergyTask {
    fn default() -> Self {
        Self {
            params: PotentialParams::default(),
            energy: 0.01,
            initial_state: (-1.0, 1.0),
            domain: (0.001, 4.0),
            n_points: 2000,
            ivp_options: IVPOptions::default(),
        }
    }
}

impl FixedEnergyTask {
    pub fn new(params: PotentialParams, energy: f64) -> Self {
        Self {
            params,
            energy,
            ..Self::default()
        }
    }

    pub fn solve(&self) -> Result<Trajectory, IVPError> {
        info!(
            "fixed energy integration: E = {}, y in [{}, {}], {} points",
            self.energy, self.domain.0, self.domain.1, self.n_points
        );
        let params = self.params;
        let E = self.energy;
        let f = move |y: f64, state: &DVector<f64>| params.rhs(y, state, E);
        let grid = linspace(self.domain.0, self.domain.1, self.n_points);
        let y0 = DVector::from_vec(vec![self.initial_state.0, self.initial_state.1]);
        let sol = solve_ivp(&f, y0, &grid, &self.ivp_options)?;
        info!(
            "fixed energy integration done: {} rhs evaluations, {} steps",
            sol.nfev, sol.naccpt
        );
        Ok(Trajectory::from_states(sol.t, &sol.y))
    }

    /// Writes `fixed_energy_y.png` and `fixed_energy_x.png` into `dir`; returns their paths.
    pub fn plot(
        &self,
        trajectory: &Trajectory,
        dir: &Path,
    ) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
        std::fs::create_dir_all(dir)?;
        let V = trajectory.potential_values(&self.params);
        let x = trajectory.x_coordinates(&self.params);

        let in_y = Figure::new(
            "Solution of the Schrodinger Equation for V(y)",
            "y",
            "Psi(y),V(y)",
        )
        .ylim(-1.2, 1.0)
        .line(&trajectory.y, &trajectory.psi, BLACK, "Psi(y)")
        .line(&trajectory.y, &V, RED, "V(y)");
        let path_y = dir.join("fixed_energy_y.png");
        save_plot(&in_y, &path_y)?;

        let in_x = Figure::new(
            "Solution of the Schrodinger Equation for V(x = -a*ln(y))",
            "x",
            "Psi,V(x)",
        )
        .ylim(-1.5, 2.5)
        .line(&x, &trajectory.psi, BLUE, "Psi(x)")
        .line(&x, &V, RED, "V(x)");
        let path_x = dir.join("fixed_energy_x.png");
        save_plot(&in_x, &path_x)?;

        info!("plots saved to {}", dir.display());
        Ok(vec![path_y, path_x])
    }
}
