//! Bisection on a scalar residual, as used by the shooting eigensolver.
//!
//! At every iteration the midpoint `guess` of `[lo, hi]` is evaluated:
//! - `|r(guess)| < tolerance`: converged;
//! - `r(guess) < 0`: `hi = guess`;
//! - otherwise: `lo = guess`.
//!
//! The update assumes a residual that decreases through its root inside the bracket.
//! Neither monotonicity nor a sign change is checked. A residual without a root runs the whole
//! iteration budget and ends as [`SearchStatus::Exhausted`] at the last midpoint.
use log::{debug, info, warn};
use std::fmt;

#[derive(Debug, Clone)]
pub struct BisectionConfig {
    /// initial (lo, hi)
    pub bracket: (f64, f64),
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for BisectionConfig {
    fn default() -> Self {
        Self {
            bracket: (0.0, 3.0),
            tolerance: 1e-6,
            max_iterations: 1000,
        }
    }
}

impl BisectionConfig {
    pub fn check(&self) -> Result<(), String> {
        let (lo, hi) = self.bracket;
        if !lo.is_finite() || !hi.is_finite() || lo >= hi {
            return Err(format!("invalid bracket [{}, {}]", lo, hi));
        }
        if !(self.tolerance > 0.0) {
            return Err(format!("tolerance must be positive, got {}", self.tolerance));
        }
        if self.max_iterations == 0 {
            return Err("max_iterations must be > 0".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStatus {
    Converged,
    Exhausted,
}

impl fmt::Display for SearchStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SearchStatus::Converged => write!(f, "Converged"),
            SearchStatus::Exhausted => write!(f, "Exhausted"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BisectionResult {
    /// last evaluated midpoint
    pub root: f64,
    /// residual at `root`
    pub residual: f64,
    pub iterations: usize,
    pub status: SearchStatus,
    /// bracket when the search stopped
    pub bracket: (f64, f64),
}

/// Runs the bisection. Errors of the residual abort the search and are returned unchanged.
/// With `max_iterations == 0` nothing is evaluated and the residual is NaN.
pub fn bisection<F, E>(mut residual: F, config: &BisectionConfig) -> Result<BisectionResult, E>
where
    F: FnMut(f64) -> Result<f64, E>,
{
    let (mut guess_min, mut guess_max) = config.bracket;
    let mut guess = (guess_min + guess_max) / 2.0;
    let mut r = f64::NAN;
    debug!(
        "bisection: bracket = [{}, {}], tolerance = {}, max_iterations = {}",
        guess_min, guess_max, config.tolerance, config.max_iterations
    );
    for iteration in 1..=config.max_iterations {
        guess = (guess_min + guess_max) / 2.0;
        r = residual(guess)?;
        debug!(
            "iteration {}: guess = {}, residual = {}, bracket = [{}, {}]",
            iteration, guess, r, guess_min, guess_max
        );
        if r.abs() < config.tolerance {
            info!(
                "bisection converged after {} iterations: root = {}, residual = {}",
                iteration, guess, r
            );
            return Ok(BisectionResult {
                root: guess,
                residual: r,
                iterations: iteration,
                status: SearchStatus::Converged,
                bracket: (guess_min, guess_max),
            });
        } else if r < 0.0 {
            guess_max = guess;
        } else {
            guess_min = guess;
        }
    }
    warn!(
        "bisection did not converge after {} iterations, continuing with guess = {} (residual = {})",
        config.max_iterations, guess, r
    );
    Ok(BisectionResult {
        root: guess,
        residual: r,
        iterations: config.max_iterations,
        status: SearchStatus::Exhausted,
        bracket: (guess_min, guess_max),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::convert::Infallible;

    fn run<F: Fn(f64) -> f64>(f: F, config: &BisectionConfig) -> BisectionResult {
        bisection(|e| Ok::<f64, Infallible>(f(e)), config).unwrap()
    }

    #[test]
    fn test_root_at_first_midpoint() {
        let res = run(|e| e - 1.5, &BisectionConfig::default());
        assert_eq!(res.status, SearchStatus::Converged);
        assert_eq!(res.iterations, 1);
        assert_eq!(res.root, 1.5);
    }

    #[test]
    fn test_decreasing_residual() {
        let res = run(|e| 1.2 - e, &BisectionConfig::default());
        assert_eq!(res.status, SearchStatus::Converged);
        assert_abs_diff_eq!(res.root, 1.2, epsilon = 1e-6);
        assert!(res.residual.abs() < 1e-6);
        assert!(res.iterations > 1 && res.iterations < 40);
    }

    #[test]
    fn test_nonlinear_decreasing_residual() {
        // root at sqrt(2)
        let res = run(|e| 2.0 - e * e, &BisectionConfig::default());
        assert_eq!(res.status, SearchStatus::Converged);
        assert_abs_diff_eq!(res.root, 2.0_f64.sqrt(), epsilon = 1e-6);
    }

    #[test]
    fn test_root_at_bracket_bound() {
        let res = run(|e| 3.0 - e, &BisectionConfig::default());
        assert_eq!(res.status, SearchStatus::Converged);
        assert_abs_diff_eq!(res.root, 3.0, epsilon = 1e-6);
    }

    #[test]
    fn test_iteration_cap() {
        let mut calls = 0;
        let config = BisectionConfig::default();
        let res = bisection(
            |e| {
                calls += 1;
                Ok::<f64, Infallible>(e * e + 1.0)
            },
            &config,
        )
        .unwrap();
        assert_eq!(res.status, SearchStatus::Exhausted);
        assert_eq!(res.iterations, 1000);
        assert_eq!(calls, 1000);
        assert!(res.residual >= 1.0);
        // always positive: lo moves up to the upper bound
        assert_abs_diff_eq!(res.root, 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_small_budget() {
        let config = BisectionConfig {
            max_iterations: 3,
            ..BisectionConfig::default()
        };
        let res = run(|e| 1.0 - e, &config);
        assert_eq!(res.status, SearchStatus::Exhausted);
        assert_eq!(res.iterations, 3);
        // 1.5 -> hi, 0.75 -> lo, 1.125 -> hi
        assert_eq!(res.root, 1.125);
        assert_eq!(res.bracket, (0.75, 1.125));
    }

    #[test]
    fn test_error_aborts_search() {
        let res: Result<BisectionResult, String> = bisection(
            |e| {
                if e < 1.0 {
                    Err(format!("failed at {}", e))
                } else {
                    Ok(1.0)
                }
            },
            &BisectionConfig::default(),
        );
        // 1.5 -> lo, 2.25 -> lo, ... never below 1.0
        assert_eq!(res.unwrap().status, SearchStatus::Exhausted);

        let res: Result<BisectionResult, String> =
            bisection(|e| Err(format!("failed at {}", e)), &BisectionConfig::default());
        assert_eq!(res.unwrap_err(), "failed at 1.5");
    }

    #[test]
    fn test_config_check() {
        assert!(BisectionConfig::default().check().is_ok());
        let bad = BisectionConfig {
            bracket: (3.0, 0.0),
            ..BisectionConfig::default()
        };
        assert!(bad.check().is_err());
        let bad = BisectionConfig {
            tolerance: 0.0,
            ..BisectionConfig::default()
        };
        assert!(bad.check().is_err());
        let bad = BisectionConfig {
            max_iterations: 0,
            ..BisectionConfig::default()
        };
        assert!(bad.check().is_err());
    }
}
