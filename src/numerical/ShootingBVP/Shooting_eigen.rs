//! # Shooting method for the energy eigenvalue
//!
//! Solves the Dirichlet-Dirichlet problem
//!
//! psi'' = -(1/y)*psi' - 2a²*(E/y² - V(y)/y²)*psi,  psi(a) = α,  psi(b) = β
//!
//! for the unknown energy E. Each trial energy is checked by integrating the IVP from y = a
//! and comparing psi(b) with β; the energy is found by bisection
//! (see [`crate::numerical::ShootingBVP::bisection`]). Once the search stops the equation is
//! integrated once more on a fine grid and the trajectory is returned.
//!
//! ## Initial slope
//! By default the trial energy is also used as the initial slope psi'(a)
//! ([`InitialSlope::EnergyCoupled`]). This mixes two unknowns into one and is most likely a defect,
//! but it is the default for compatibility. [`InitialSlope::Fixed`] keeps psi'(a) constant
//! and lets only the energy vary.
//!
//! ## Usage Example
//! ```rust, ignore
//! use SchrodingerShooting::numerical::ShootingBVP::Shooting_eigen::*;
//! let mut solver = ShootingMethodSolver::new(PotentialParams::default(), BoundaryValueProblem::default());
//! let solution = solver.solve()?;
//! if !solution.is_converged() {
//!     println!("residual after exhaustion: {}", solution.residual);
//! }
//! solver.plot(&solution, std::path::Path::new("results"))?;
//! ```
use crate::Utils::logging::log_summary;
use crate::Utils::plots::{Figure, save_plot};
use crate::numerical::NonStiff_api::{
    IVPError, IVPOptions, linspace, solve_ivp, solve_ivp_endpoint,
};
use crate::numerical::Schrodinger::potential::{PotentialParams, Trajectory};
use crate::numerical::ShootingBVP::bisection::{
    BisectionConfig, BisectionResult, SearchStatus, bisection,
};
use log::{debug, error, info, warn};
use nalgebra::DVector;
use plotters::style::{BLACK, BLUE, RED};
use std::fmt;
use std::path::{Path, PathBuf};

/// psi(a) = alpha, psi(b) = beta on [a, b]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundaryValueProblem {
    pub a: f64,
    pub b: f64,
    pub alpha: f64,
    pub beta: f64,
}

impl Default for BoundaryValueProblem {
    fn default() -> Self {
        Self {
            a: 0.001,
            b: 10.0,
            alpha: -1.0,
            beta: 0.0,
        }
    }
}

/// psi'(a) used for a trial energy
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InitialSlope {
    /// psi'(a) = trial energy
    EnergyCoupled,
    /// psi'(a) = given constant
    Fixed(f64),
}

impl InitialSlope {
    pub fn value(&self, energy: f64) -> f64 {
        match self {
            InitialSlope::EnergyCoupled => energy,
            InitialSlope::Fixed(s) => *s,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ShootingError {
    InvalidConfig(String),
    Integration(IVPError),
}

impl fmt::Display for ShootingError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ShootingError::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
            ShootingError::Integration(e) => write!(f, "Integration failed: {}", e),
        }
    }
}

impl std::error::Error for ShootingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ShootingError::Integration(e) => Some(e),
            _ => None,
        }
    }
}

impl From<IVPError> for ShootingError {
    fn from(e: IVPError) -> Self {
        ShootingError::Integration(e)
    }
}

#[derive(Debug, Clone)]
pub struct EigenSolution {
    pub energy: f64,
    /// psi(b) - beta at `energy`
    pub residual: f64,
    pub iterations: usize,
    pub status: SearchStatus,
    pub trajectory: Trajectory,
}

impl EigenSolution {
    pub fn is_converged(&self) -> bool {
        self.status == SearchStatus::Converged
    }

    pub fn is_within_tolerance(&self, tol: f64) -> bool {
        self.residual.abs() < tol
    }

    /// psi at the right end of the final trajectory
    pub fn boundary_value(&self) -> Option<f64> {
        self.trajectory.last().map(|(_, psi, _)| psi)
    }
}

pub struct ShootingMethodSolver {
    pub params: PotentialParams,
    pub problem: BoundaryValueProblem,
    pub config: BisectionConfig,
    /// points of the final trajectory
    pub n_points: usize,
    pub slope: InitialSlope,
    pub ivp_options: IVPOptions,
    /// upper end of the y window shown in the plots
    pub display_max: f64,
    pub result: Option<EigenSolution>,
}

impl ShootingMethodSolver {
    pub fn new(params: PotentialParams, problem: BoundaryValueProblem) -> Self {
        Self {
            params,
            problem,
            config: BisectionConfig::default(),
            n_points: 3000,
            slope: InitialSlope::EnergyCoupled,
            ivp_options: IVPOptions::default(),
            display_max: 4.0,
            result: None,
        }
    }

    pub fn check(&self) -> Result<(), ShootingError> {
        let p = &self.problem;
        if !p.a.is_finite() || !p.b.is_finite() || p.a >= p.b {
            return Err(ShootingError::InvalidConfig(format!(
                "domain [{}, {}] must be finite and increasing",
                p.a, p.b
            )));
        }
        if !p.alpha.is_finite() || !p.beta.is_finite() {
            return Err(ShootingError::InvalidConfig(
                "boundary values must be finite".to_string(),
            ));
        }
        if self.n_points < 2 {
            return Err(ShootingError::InvalidConfig(format!(
                "final grid needs at least 2 points, got {}",
                self.n_points
            )));
        }
        self.config.check().map_err(ShootingError::InvalidConfig)?;
        self.ivp_options.check()?;
        Ok(())
    }

    fn initial_state(&self, energy: f64) -> DVector<f64> {
        DVector::from_vec(vec![self.problem.alpha, self.slope.value(energy)])
    }

    /// psi(b) - beta for a trial energy
    pub fn residual(&self, energy: f64) -> Result<f64, IVPError> {
        let params = self.params;
        let f = move |y: f64, state: &DVector<f64>| params.rhs(y, state, energy);
        let end = solve_ivp_endpoint(
            &f,
            self.problem.a,
            self.initial_state(energy),
            self.problem.b,
            &self.ivp_options,
        )?;
        Ok(end[0] - self.problem.beta)
    }

    /// Bisection over the configured energy bracket with any residual.
    pub fn search_energy<F>(&self, residual: F) -> Result<BisectionResult, ShootingError>
    where
        F: FnMut(f64) -> Result<f64, IVPError>,
    {
        self.config.check().map_err(ShootingError::InvalidConfig)?;
        let result = bisection(residual, &self.config)?;
        Ok(result)
    }

    /// Trajectory at `energy` on `n_points` uniform points over [a, b].
    pub fn final_integration(&self, energy: f64) -> Result<Trajectory, ShootingError> {
        let params = self.params;
        let f = move |y: f64, state: &DVector<f64>| params.rhs(y, state, energy);
        let grid = linspace(self.problem.a, self.problem.b, self.n_points);
        let sol = solve_ivp(&f, self.initial_state(energy), &grid, &self.ivp_options)?;
        debug!(
            "final integration: nfev = {}, accepted = {}, rejected = {}",
            sol.nfev, sol.naccpt, sol.nrejct
        );
        Ok(Trajectory::from_states(sol.t, &sol.y))
    }

    pub fn solve(&mut self) -> Result<EigenSolution, ShootingError> {
        info!("Starting shooting method solver");
        debug!(
            "Problem parameters: a={}, b={}, alpha={}, beta={}, slope={:?}",
            self.problem.a, self.problem.b, self.problem.alpha, self.problem.beta, self.slope
        );
        debug!(
            "Solver parameters: bracket={:?}, tolerance={}, max_iterations={}, method={:?}",
            self.config.bracket,
            self.config.tolerance,
            self.config.max_iterations,
            self.ivp_options.method
        );
        if let Err(e) = self.check() {
            error!("{}", e);
            return Err(e);
        }

        let search = self
            .search_energy(|energy| self.residual(energy))
            .inspect_err(|e| error!("energy search failed: {}", e))?;
        match search.status {
            SearchStatus::Converged => info!("Found energy: {}", search.root),
            SearchStatus::Exhausted => warn!(
                "energy search exhausted, using last guess {} (residual {})",
                search.root, search.residual
            ),
        }

        info!("starting final solution...");
        let trajectory = self.final_integration(search.root)?;
        // both integrators land on b with the same steps as the residual runs
        let residual = trajectory
            .last()
            .map(|(_, psi, _)| psi - self.problem.beta)
            .unwrap_or(search.residual);
        if residual != search.residual {
            warn!(
                "final trajectory residual {} differs from search residual {}",
                residual, search.residual
            );
        }
        let solution = EigenSolution {
            energy: search.root,
            residual,
            iterations: search.iterations,
            status: search.status,
            trajectory,
        };
        if let Some((y_end, psi_end, dpsi_end)) = solution.trajectory.last() {
            info!(
                "Final solution: psi({})={}, psi'({})={}",
                y_end, psi_end, y_end, dpsi_end
            );
        }
        self.summary(&solution);
        self.result = Some(solution.clone());
        Ok(solution)
    }

    /// Logs the run as a table; returns the rendered table.
    pub fn summary(&self, solution: &EigenSolution) -> String {
        let rows = vec![
            ("energy".to_string(), format!("{:.10}", solution.energy)),
            ("residual".to_string(), format!("{:.3e}", solution.residual)),
            ("iterations".to_string(), solution.iterations.to_string()),
            ("status".to_string(), solution.status.to_string()),
            (
                "nodes".to_string(),
                solution.trajectory.node_count().to_string(),
            ),
            (
                "domain".to_string(),
                format!("[{}, {}]", self.problem.a, self.problem.b),
            ),
            ("integrator".to_string(), format!("{:?}", self.ivp_options.method)),
        ];
        log_summary("SHOOTING RESULT", &rows)
    }

    /// Writes `shooting_y.png` and `shooting_x.png` into `dir`; returns their paths.
    /// Only the part of the trajectory with y <= display_max is drawn.
    pub fn plot(
        &self,
        solution: &EigenSolution,
        dir: &Path,
    ) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
        std::fs::create_dir_all(dir)?;
        let traj = &solution.trajectory;
        let shown: Vec<usize> = (0..traj.len())
            .filter(|&i| traj.y[i] <= self.display_max)
            .collect();
        let y = DVector::from_iterator(shown.len(), shown.iter().map(|&i| traj.y[i]));
        let psi = DVector::from_iterator(shown.len(), shown.iter().map(|&i| traj.psi[i]));
        let V = y.map(|y| self.params.potential(y));
        let x = y.map(|y| self.params.x_coordinate(y));

        let title = format!("Eigenfunction for E = {:.6}", solution.energy);
        let in_y = Figure::new(&title, "y", "Psi(y),V(y)")
            .ylim(-1.5, 1.5)
            .line(&y, &psi, BLACK, "Psi(y)")
            .line(&y, &V, RED, "V(y)");
        let path_y = dir.join("shooting_y.png");
        save_plot(&in_y, &path_y)?;

        let in_x = Figure::new(&format!("{} in x = -a*ln(y)", title), "x", "Psi,V(x)")
            .ylim(-1.5, 2.5)
            .line(&x, &psi, BLUE, "Psi(x)")
            .line(&x, &V, RED, "V(x)");
        let path_x = dir.join("shooting_x.png");
        save_plot(&in_x, &path_x)?;

        info!("plots saved to {}", dir.display());
        Ok(vec![path_y, path_x])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numerical::NonStiff_api::IntegrationMethod;
    use approx::assert_abs_diff_eq;
    use simplelog::*;

    fn init_logger() {
        let _ = SimpleLogger::init(LevelFilter::Info, Config::default());
    }

    fn default_solver() -> ShootingMethodSolver {
        ShootingMethodSolver::new(PotentialParams::default(), BoundaryValueProblem::default())
    }

    #[test]
    fn test_search_with_closed_form_residual() {
        let solver = default_solver();
        let res = solver.search_energy(|e| Ok(e - 1.5)).unwrap();
        assert_eq!(res.status, SearchStatus::Converged);
        assert_eq!(res.root, 1.5);

        let res = solver.search_energy(|e| Ok(0.4 - e)).unwrap();
        assert_eq!(res.status, SearchStatus::Converged);
        assert_abs_diff_eq!(res.root, 0.4, epsilon = 1e-6);
    }

    #[test]
    fn test_search_without_root_is_exhausted() {
        let solver = default_solver();
        let res = solver.search_energy(|e| Ok(10.0 + e)).unwrap();
        assert_eq!(res.status, SearchStatus::Exhausted);
        assert_eq!(res.iterations, 1000);
    }

    #[test]
    fn test_search_propagates_integration_error() {
        let solver = default_solver();
        let res = solver.search_energy(|e| Err(IVPError::NonFiniteState { x: e }));
        assert_eq!(
            res.unwrap_err(),
            ShootingError::Integration(IVPError::NonFiniteState { x: 1.5 })
        );
    }

    #[test]
    fn test_residual_matches_final_integration() {
        let mut solver = default_solver();
        solver.problem.b = 3.0;
        solver.n_points = 500;
        let energy = 0.8;
        let r = solver.residual(energy).unwrap();
        let traj = solver.final_integration(energy).unwrap();
        assert_eq!(traj.len(), 500);
        assert_eq!(traj.first().unwrap().1, -1.0);
        assert_eq!(traj.first().unwrap().2, 0.8);
        assert_eq!(traj.last().unwrap().1 - solver.problem.beta, r);
    }

    #[test]
    fn test_fixed_slope() {
        let mut solver = default_solver();
        solver.slope = InitialSlope::Fixed(0.25);
        solver.problem.b = 2.0;
        solver.n_points = 10;
        let traj = solver.final_integration(1.0).unwrap();
        assert_eq!(traj.first(), Some((0.001, -1.0, 0.25)));
        assert_eq!(InitialSlope::EnergyCoupled.value(0.7), 0.7);
        assert_eq!(InitialSlope::Fixed(0.25).value(0.7), 0.25);
    }

    #[test]
    fn test_domain_through_zero_is_an_error() {
        let mut solver = default_solver();
        solver.problem.a = 0.0;
        let res = solver.solve();
        assert!(matches!(
            res,
            Err(ShootingError::Integration(IVPError::NonFiniteState { .. }))
        ));
        assert!(solver.result.is_none());
    }

    #[test]
    fn test_invalid_config() {
        let mut solver = default_solver();
        solver.problem.b = -1.0;
        assert!(matches!(solver.solve(), Err(ShootingError::InvalidConfig(_))));

        let mut solver = default_solver();
        solver.config.max_iterations = 0;
        assert!(matches!(solver.solve(), Err(ShootingError::InvalidConfig(_))));

        let mut solver = default_solver();
        solver.n_points = 1;
        assert!(matches!(solver.solve(), Err(ShootingError::InvalidConfig(_))));
    }

    #[test]
    fn test_end_to_end_default_problem() {
        init_logger();
        let mut solver = default_solver();
        let solution = solver.solve().unwrap();
        assert_eq!(solution.trajectory.len(), 3000);
        assert_eq!(solution.trajectory.first().unwrap().0, 0.001);
        assert_eq!(solution.trajectory.last().unwrap().0, 10.0);
        assert!(solution.energy >= 0.0 && solution.energy <= 3.0);
        let psi_end = solution.boundary_value().unwrap();
        assert!(solution.is_converged());
        assert!(solution.iterations < 1000);
        assert!(psi_end.abs() < 1e-6);
        assert!(solution.is_within_tolerance(1e-6));
        assert_eq!(psi_end - solver.problem.beta, solution.residual);
        assert!(solver.result.is_some());
    }

    #[test]
    fn test_end_to_end_rk4_short_domain() {
        init_logger();
        let mut solver = default_solver();
        solver.problem.a = 0.1;
        solver.problem.b = 2.0;
        solver.n_points = 200;
        solver.config.max_iterations = 60;
        solver.ivp_options = IVPOptions::with_method(IntegrationMethod::RK4);
        solver.ivp_options.rk4_step = 1e-3;
        let solution = solver.solve().unwrap();
        let psi_end = solution.boundary_value().unwrap();
        assert!(psi_end.is_finite());
        assert_eq!(solution.trajectory.len(), 200);
        assert_eq!(psi_end - solver.problem.beta, solution.residual);
        if solution.is_converged() {
            assert!((psi_end - solver.problem.beta).abs() < 1e-6);
        } else {
            assert_eq!(solution.iterations, 60);
        }
    }

    #[test]
    fn test_rk4_residual_matches_trajectory() {
        // the residual run goes straight to b, the final run samples 3000 points
        let mut solver = default_solver();
        solver.problem.b = 4.0;
        solver.ivp_options = IVPOptions::with_method(IntegrationMethod::RK4);
        for &energy in &[0.3, 1.0, 2.2] {
            let r = solver.residual(energy).unwrap();
            let traj = solver.final_integration(energy).unwrap();
            assert_eq!(traj.last().unwrap().1 - solver.problem.beta, r);
        }

        solver.config.max_iterations = 80;
        let solution = solver.solve().unwrap();
        let psi_end = solution.boundary_value().unwrap();
        assert_eq!(psi_end - solver.problem.beta, solution.residual);
        if solution.is_converged() {
            assert!((psi_end - solver.problem.beta).abs() < solver.config.tolerance);
        }
    }

    #[test]
    fn test_summary_lists_result() {
        let solver = default_solver();
        let traj = solver.final_integration(0.5).unwrap();
        let solution = EigenSolution {
            energy: 0.5,
            residual: 2e-7,
            iterations: 12,
            status: SearchStatus::Converged,
            trajectory: traj,
        };
        let table = solver.summary(&solution);
        assert!(table.contains("Converged"));
        assert!(table.contains("0.5000000000"));
        assert!(solution.is_within_tolerance(1e-6));
        assert!(!solution.is_within_tolerance(1e-7));
    }
}
