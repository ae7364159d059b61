//! Potential V(y) = V0*(y² - 2y)/C and the radial Schrödinger equation in the variable y,
//! written as a first-order system for the state (psi, dpsi/dy):
//!
//! psi'' = -(1/y)*psi' - 2a²*(E/y² - V(y)/y²)*psi
//!
//! The system is singular at y = 0, integration domains start at a small positive offset.
use nalgebra::{DMatrix, DVector};

/// Constants of the potential. `a` is the length scale of the substitution x = -a*ln(y).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PotentialParams {
    pub V0: f64,
    pub C: f64,
    pub a: f64,
}

impl Default for PotentialParams {
    fn default() -> Self {
        Self {
            V0: 1.0,
            C: 1.0,
            a: 1.0,
        }
    }
}

impl PotentialParams {
    pub fn new(V0: f64, C: f64, a: f64) -> Self {
        Self { V0, C, a }
    }

    /// V(y) = V0*(y² - 2y)/C, defined for every real y
    pub fn potential(&self, y: f64) -> f64 {
        self.V0 * (y * y - 2.0 * y) / self.C
    }

    /// right-hand side of the first-order system at energy `E`.
    /// Non-finite at y = 0.
    pub fn rhs(&self, y: f64, state: &DVector<f64>, E: f64) -> DVector<f64> {
        let psi = state[0];
        let dpsi = state[1];
        let y2 = y * y;
        let d2psi = -dpsi / y - 2.0 * self.a * self.a * (E / y2 - self.potential(y) / y2) * psi;
        DVector::from_vec(vec![dpsi, d2psi])
    }

    /// x = -a*ln(y)
    pub fn x_coordinate(&self, y: f64) -> f64 {
        -self.a * y.ln()
    }
}

/// Sampled solution: psi and dpsi/dy on an ordered y grid
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    pub y: DVector<f64>,
    pub psi: DVector<f64>,
    pub dpsi: DVector<f64>,
}

impl Trajectory {
    /// Builds a trajectory from the grid and a states matrix with one row per point.
    pub fn from_states(y: DVector<f64>, states: &DMatrix<f64>) -> Self {
        Trajectory {
            psi: states.column(0).into_owned(),
            dpsi: states.column(1).into_owned(),
            y,
        }
    }

    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    /// (y, psi, dpsi) at the first point
    pub fn first(&self) -> Option<(f64, f64, f64)> {
        self.point(0)
    }

    /// (y, psi, dpsi) at the last point
    pub fn last(&self) -> Option<(f64, f64, f64)> {
        if self.is_empty() {
            return None;
        }
        self.point(self.len() - 1)
    }

    fn point(&self, i: usize) -> Option<(f64, f64, f64)> {
        if i < self.len() {
            Some((self.y[i], self.psi[i], self.dpsi[i]))
        } else {
            None
        }
    }

    pub fn x_coordinates(&self, params: &PotentialParams) -> DVector<f64> {
        self.y.map(|y| params.x_coordinate(y))
    }

    pub fn potential_values(&self, params: &PotentialParams) -> DVector<f64> {
        self.y.map(|y| params.potential(y))
    }

    /// number of sign changes of psi; exact zeros are skipped
    pub fn node_count(&self) -> usize {
        let mut nodes = 0;
        let mut prev_sign = 0.0;
        for &psi in self.psi.iter() {
            if psi == 0.0 || !psi.is_finite() {
                continue;
            }
            let sign = psi.signum();
            if prev_sign != 0.0 && sign != prev_sign {
                nodes += 1;
            }
            prev_sign = sign;
        }
        nodes
    }

    /// columns: y, psi, dpsi
    pub fn to_matrix(&self) -> DMatrix<f64> {
        let mut m = DMatrix::zeros(self.len(), 3);
        m.set_column(0, &self.y);
        m.set_column(1, &self.psi);
        m.set_column(2, &self.dpsi);
        m
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_potential_special_points() {
        let params = PotentialParams::default();
        assert_eq!(params.potential(0.0), 0.0);
        assert_eq!(params.potential(2.0), 0.0);
        assert_eq!(params.potential(params.C), -1.0);

        let params = PotentialParams::new(2.5, 3.0, 1.0);
        assert_abs_diff_eq!(
            params.potential(params.C),
            2.5 * (9.0 - 6.0) / 3.0,
            epsilon = 1e-14
        );
    }

    #[test]
    fn test_potential_formula() {
        let params = PotentialParams::new(0.7, 1.3, 2.0);
        for i in 0..50 {
            let y = -3.0 + 0.17 * i as f64;
            assert_eq!(params.potential(y), 0.7 * (y * y - 2.0 * y) / 1.3);
        }
    }

    #[test]
    fn test_rhs_first_component_is_derivative() {
        let params = PotentialParams::default();
        for &y in &[0.001, 0.5, 1.0, 3.7, -2.0] {
            let state = DVector::from_vec(vec![-1.0, 0.37]);
            let d = params.rhs(y, &state, 0.01);
            assert_eq!(d[0], 0.37);
            assert!(d[1].is_finite());
        }
    }

    #[test]
    fn test_rhs_second_component() {
        let params = PotentialParams::new(1.0, 1.0, 2.0);
        let y = 0.5;
        let E = 0.3;
        let state = DVector::from_vec(vec![0.8, -0.2]);
        let d = params.rhs(y, &state, E);
        let expected = 0.2 / y - 8.0 * (E / 0.25 - params.potential(y) / 0.25) * 0.8;
        assert_abs_diff_eq!(d[1], expected, epsilon = 1e-12);
    }

    #[test]
    fn test_rhs_singular_at_zero() {
        let params = PotentialParams::default();
        let d = params.rhs(0.0, &DVector::from_vec(vec![-1.0, 1.0]), 0.01);
        assert!(!d[1].is_finite());
    }

    #[test]
    fn test_x_coordinate() {
        let params = PotentialParams::new(1.0, 1.0, 2.0);
        assert_eq!(params.x_coordinate(1.0), 0.0);
        assert_abs_diff_eq!(params.x_coordinate(std::f64::consts::E), -2.0, epsilon = 1e-14);
    }

    #[test]
    fn test_trajectory_helpers() {
        let y = DVector::from_vec(vec![0.5, 1.0, 1.5, 2.0, 2.5]);
        let states = DMatrix::from_row_slice(
            5,
            2,
            &[-1.0, 1.0, -0.5, 1.0, 0.0, 1.0, 0.5, -1.0, -0.1, -1.0],
        );
        let traj = Trajectory::from_states(y, &states);
        assert_eq!(traj.len(), 5);
        assert_eq!(traj.first(), Some((0.5, -1.0, 1.0)));
        assert_eq!(traj.last(), Some((2.5, -0.1, -1.0)));
        // -, -, 0, +, -  -> two sign changes
        assert_eq!(traj.node_count(), 2);
        let m = traj.to_matrix();
        assert_eq!(m.ncols(), 3);
        assert_eq!(m[(3, 0)], 2.0);
        assert_eq!(m[(3, 1)], 0.5);
        let v = traj.potential_values(&PotentialParams::default());
        assert_eq!(v[3], 0.0);
    }

    #[test]
    fn test_empty_trajectory() {
        let traj = Trajectory::from_states(DVector::zeros(0), &DMatrix::zeros(0, 2));
        assert!(traj.is_empty());
        assert_eq!(traj.first(), None);
        assert_eq!(traj.last(), None);
        assert_eq!(traj.node_count(), 0);
    }
}
