//! # Non-stiff IVP integrators
//!
//! Explicit Runge-Kutta integrators for first-order systems dy/dx = f(x, y),
//! sampled at an explicit, ordered list of evaluation points.
//!
//! Two methods are available:
//! 1. **DOPRI5**: Dormand-Prince 5(4) pair with adaptive step size and
//!    continuous (dense) output. The requested points do not constrain the
//!    step sequence, so a run over a fine grid and a run to a single endpoint
//!    take exactly the same steps and return the same value at the endpoint.
//! 2. **RK4**: classic fixed-step 4th-order Runge-Kutta on a uniform lattice
//!    spanning the whole interval. Requested points between lattice nodes are
//!    reached by a shortened step that does not feed back into the lattice, so
//!    the endpoint value is again independent of the requested points.
//!
//! ## Usage Example
//! ```rust, ignore
//! use nalgebra::DVector;
//! let f = |_x: f64, y: &DVector<f64>| DVector::from_vec(vec![y[1], -y[0]]);
//! let t_eval = linspace(0.0, std::f64::consts::PI, 100);
//! let sol = solve_ivp(&f, DVector::from_vec(vec![1.0, 0.0]), &t_eval, &IVPOptions::default())?;
//! // last row ≈ [cos(π), -sin(π)]
//! ```

use log::{debug, warn};
use nalgebra::{DMatrix, DVector};
use std::fmt;
use strum_macros::EnumIter;

/// Integration methods available through [`solve_ivp`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum IntegrationMethod {
    /// fixed-step classic Runge-Kutta
    RK4,
    /// adaptive Dormand-Prince 5(4) with dense output
    DOPRI5,
}

impl IntegrationMethod {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "RK4" => Some(IntegrationMethod::RK4),
            "DOPRI5" | "RK45" => Some(IntegrationMethod::DOPRI5),
            _ => None,
        }
    }
}

/// Errors of the IVP integrators
#[derive(Debug, Clone, PartialEq)]
pub enum IVPError {
    /// evaluation grid is empty, unordered or contains non-finite points
    InvalidGrid(String),
    /// integrator option out of range
    InvalidOption(String),
    /// right-hand side or state became NaN/inf
    NonFiniteState { x: f64 },
    /// adaptive step collapsed below rounding level
    StepSizeTooSmall { x: f64 },
    /// step budget exhausted before reaching the end of the grid
    TooManySteps { x: f64, max_steps: usize },
}

impl fmt::Display for IVPError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            IVPError::InvalidGrid(msg) => write!(f, "Invalid evaluation grid: {}", msg),
            IVPError::InvalidOption(msg) => write!(f, "Invalid integrator option: {}", msg),
            IVPError::NonFiniteState { x } => {
                write!(f, "Non-finite state or derivative encountered at x = {}", x)
            }
            IVPError::StepSizeTooSmall { x } => write!(f, "Step size too small at x = {}", x),
            IVPError::TooManySteps { x, max_steps } => write!(
                f,
                "Maximum number of steps ({}) reached at x = {}",
                max_steps, x
            ),
        }
    }
}

impl std::error::Error for IVPError {}

/// Integrator settings
#[derive(Debug, Clone)]
pub struct IVPOptions {
    pub method: IntegrationMethod,
    /// relative tolerance (DOPRI5)
    pub rtol: f64,
    /// absolute tolerance (DOPRI5)
    pub atol: f64,
    /// initial step; heuristic if None (DOPRI5)
    pub first_step: Option<f64>,
    /// upper bound on |h|; whole interval if None (DOPRI5)
    pub max_step: Option<f64>,
    /// step budget for one call
    pub max_steps: usize,
    /// nominal step (RK4)
    pub rk4_step: f64,
}

impl Default for IVPOptions {
    fn default() -> Self {
        Self {
            method: IntegrationMethod::DOPRI5,
            rtol: 1e-9,
            atol: 1e-11,
            first_step: None,
            max_step: None,
            max_steps: 1_000_000,
            rk4_step: 1e-4,
        }
    }
}

impl IVPOptions {
    pub fn with_method(method: IntegrationMethod) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    pub fn check(&self) -> Result<(), IVPError> {
        if !(self.rtol > 0.0) || !(self.atol > 0.0) {
            return Err(IVPError::InvalidOption(format!(
                "tolerances must be positive, got rtol={}, atol={}",
                self.rtol, self.atol
            )));
        }
        if self.max_steps == 0 {
            return Err(IVPError::InvalidOption("max_steps must be > 0".to_string()));
        }
        if !(self.rk4_step > 0.0) || !self.rk4_step.is_finite() {
            return Err(IVPError::InvalidOption(format!(
                "rk4_step must be positive, got {}",
                self.rk4_step
            )));
        }
        if let Some(h) = self.first_step {
            if !(h.abs() > 0.0) || !h.is_finite() {
                return Err(IVPError::InvalidOption(format!("bad first_step {}", h)));
            }
        }
        if let Some(h) = self.max_step {
            if !(h > 0.0) {
                return Err(IVPError::InvalidOption(format!("bad max_step {}", h)));
            }
        }
        Ok(())
    }
}

/// Sampled IVP solution
#[derive(Debug, Clone)]
pub struct IVPSolution {
    /// evaluation points
    pub t: DVector<f64>,
    /// row i is the state at t[i]
    pub y: DMatrix<f64>,
    /// number of right-hand side evaluations
    pub nfev: usize,
    /// accepted steps
    pub naccpt: usize,
    /// rejected steps
    pub nrejct: usize,
}

impl IVPSolution {
    /// state at the last evaluation point
    pub fn last_state(&self) -> DVector<f64> {
        self.y.row(self.y.nrows() - 1).transpose()
    }
}

/// `n` uniformly spaced points from `start` to `end` inclusive
pub fn linspace(start: f64, end: f64, n: usize) -> DVector<f64> {
    match n {
        0 => DVector::zeros(0),
        1 => DVector::from_element(1, start),
        _ => {
            let step = (end - start) / (n - 1) as f64;
            DVector::from_fn(n, |i, _| {
                if i == n - 1 {
                    end
                } else {
                    start + step * i as f64
                }
            })
        }
    }
}

fn all_finite(v: &DVector<f64>) -> bool {
    v.iter().all(|x| x.is_finite())
}

fn check_grid(t_eval: &DVector<f64>) -> Result<f64, IVPError> {
    if t_eval.is_empty() {
        return Err(IVPError::InvalidGrid("no evaluation points".to_string()));
    }
    if !all_finite(t_eval) {
        return Err(IVPError::InvalidGrid("non-finite evaluation point".to_string()));
    }
    let n = t_eval.len();
    let direction = (t_eval[n - 1] - t_eval[0]).signum();
    for i in 1..n {
        if (t_eval[i] - t_eval[i - 1]) * direction <= 0.0 {
            return Err(IVPError::InvalidGrid(format!(
                "points must be strictly monotonic (index {})",
                i
            )));
        }
    }
    Ok(direction)
}

//////////////////////////////////////////////////////////////////////////////////////////////
//                       DORMAND-PRINCE 5(4)
//////////////////////////////////////////////////////////////////////////////////////////////

const C2: f64 = 1.0 / 5.0;
const C3: f64 = 3.0 / 10.0;
const C4: f64 = 4.0 / 5.0;
const C5: f64 = 8.0 / 9.0;

const A21: f64 = 1.0 / 5.0;
const A31: f64 = 3.0 / 40.0;
const A32: f64 = 9.0 / 40.0;
const A41: f64 = 44.0 / 45.0;
const A42: f64 = -56.0 / 15.0;
const A43: f64 = 32.0 / 9.0;
const A51: f64 = 19372.0 / 6561.0;
const A52: f64 = -25360.0 / 2187.0;
const A53: f64 = 64448.0 / 6561.0;
const A54: f64 = -212.0 / 729.0;
const A61: f64 = 9017.0 / 3168.0;
const A62: f64 = -355.0 / 33.0;
const A63: f64 = 46732.0 / 5247.0;
const A64: f64 = 49.0 / 176.0;
const A65: f64 = -5103.0 / 18656.0;
const A71: f64 = 35.0 / 384.0;
const A73: f64 = 500.0 / 1113.0;
const A74: f64 = 125.0 / 192.0;
const A75: f64 = -2187.0 / 6784.0;
const A76: f64 = 11.0 / 84.0;

const E1: f64 = 71.0 / 57600.0;
const E3: f64 = -71.0 / 16695.0;
const E4: f64 = 71.0 / 1920.0;
const E5: f64 = -17253.0 / 339200.0;
const E6: f64 = 22.0 / 525.0;
const E7: f64 = -1.0 / 40.0;

// dense output (Shampine)
const D1: f64 = -12715105075.0 / 11282082432.0;
const D3: f64 = 87487479700.0 / 32700410799.0;
const D4: f64 = -10690763975.0 / 1880347072.0;
const D5: f64 = 701980252875.0 / 199316789632.0;
const D6: f64 = -1453857185.0 / 822651844.0;
const D7: f64 = 69997945.0 / 29380423.0;

const SAFETY: f64 = 0.9;
const FAC_MIN: f64 = 0.2; // 1/facc1
const FAC_MAX: f64 = 10.0; // 1/facc2
const BETA: f64 = 0.04;
const UROUND: f64 = 2.3e-16;

/// Adaptive Dormand-Prince stepper.
///
/// After every accepted step the dense-output coefficients of that step are
/// kept, so any point in [x_old, x] can be evaluated with [`DormandPrince::interpolate`].
pub struct DormandPrince<'a, F>
where
    F: Fn(f64, &DVector<f64>) -> DVector<f64>,
{
    f: &'a F,
    pub x: f64,
    pub y: DVector<f64>,
    pub x_old: f64,
    h: f64,
    h_max: f64,
    posneg: f64,
    rtol: f64,
    atol: f64,
    k1: DVector<f64>,
    cont: [DVector<f64>; 5],
    facold: f64,
    reject: bool,
    pub nfev: usize,
    pub naccpt: usize,
    pub nrejct: usize,
}

impl<'a, F> DormandPrince<'a, F>
where
    F: Fn(f64, &DVector<f64>) -> DVector<f64>,
{
    pub fn new(
        f: &'a F,
        x0: f64,
        y0: DVector<f64>,
        x_end: f64,
        options: &IVPOptions,
    ) -> Result<Self, IVPError> {
        let posneg = if x_end >= x0 { 1.0 } else { -1.0 };
        let k1 = f(x0, &y0);
        if !all_finite(&k1) || !all_finite(&y0) {
            return Err(IVPError::NonFiniteState { x: x0 });
        }
        let h_max = options.max_step.unwrap_or((x_end - x0).abs()).max(f64::MIN_POSITIVE);
        let n = y0.len();
        let mut stepper = DormandPrince {
            f,
            x: x0,
            y: y0.clone(),
            x_old: x0,
            h: 0.0,
            h_max,
            posneg,
            rtol: options.rtol,
            atol: options.atol,
            k1,
            cont: [
                y0,
                DVector::zeros(n),
                DVector::zeros(n),
                DVector::zeros(n),
                DVector::zeros(n),
            ],
            facold: 1e-4,
            reject: false,
            nfev: 1,
            naccpt: 0,
            nrejct: 0,
        };
        stepper.h = match options.first_step {
            Some(h0) => h0.abs().min(h_max) * posneg,
            None => stepper.initial_step()?,
        };
        Ok(stepper)
    }

    fn scale(&self, i: usize, a: &DVector<f64>, b: &DVector<f64>) -> f64 {
        self.atol + self.rtol * a[i].abs().max(b[i].abs())
    }

    /// Hairer's starting step heuristic
    fn initial_step(&mut self) -> Result<f64, IVPError> {
        let n = self.y.len();
        if n == 0 {
            return Ok(self.h_max * self.posneg);
        }
        let (mut dnf, mut dny) = (0.0, 0.0);
        for i in 0..n {
            let sk = self.atol + self.rtol * self.y[i].abs();
            dnf += (self.k1[i] / sk).powi(2);
            dny += (self.y[i] / sk).powi(2);
        }
        let mut h = if dnf <= 1e-10 || dny <= 1e-10 {
            1e-6
        } else {
            (dny / dnf).sqrt() * 0.01
        };
        h = h.min(self.h_max) * self.posneg;
        let y1 = &self.y + h * &self.k1;
        let f1 = (self.f)(self.x + h, &y1);
        self.nfev += 1;
        if !all_finite(&f1) {
            return Err(IVPError::NonFiniteState { x: self.x + h });
        }
        let mut der2 = 0.0;
        for i in 0..n {
            let sk = self.atol + self.rtol * self.y[i].abs();
            der2 += ((f1[i] - self.k1[i]) / sk).powi(2);
        }
        der2 = der2.sqrt() / h.abs();
        let der12 = der2.max(dnf.sqrt());
        let h1 = if der12 <= 1e-15 {
            1e-6_f64.max(h.abs() * 1e-3)
        } else {
            (0.01 / der12).powf(1.0 / 5.0)
        };
        Ok((100.0 * h.abs()).min(h1).min(self.h_max) * self.posneg)
    }

    /// Advance by one accepted step, never passing `x_end`.
    pub fn step(&mut self, x_end: f64) -> Result<(), IVPError> {
        let f = self.f;
        let n = self.y.len();
        let expo1 = 0.2 - BETA * 0.75;
        loop {
            if 0.1 * self.h.abs() <= self.x.abs() * UROUND {
                return Err(IVPError::StepSizeTooSmall { x: self.x });
            }
            let mut last = false;
            if (self.x + 1.01 * self.h - x_end) * self.posneg > 0.0 {
                self.h = x_end - self.x;
                last = true;
            }
            let h = self.h;
            let x = self.x;
            let y = &self.y;
            let k1 = &self.k1;

            let k2 = f(x + C2 * h, &(y + h * A21 * k1));
            let k3 = f(x + C3 * h, &(y + h * (A31 * k1 + A32 * &k2)));
            let k4 = f(x + C4 * h, &(y + h * (A41 * k1 + A42 * &k2 + A43 * &k3)));
            let k5 = f(
                x + C5 * h,
                &(y + h * (A51 * k1 + A52 * &k2 + A53 * &k3 + A54 * &k4)),
            );
            let xph = x + h;
            let k6 = f(
                xph,
                &(y + h * (A61 * k1 + A62 * &k2 + A63 * &k3 + A64 * &k4 + A65 * &k5)),
            );
            let y1 = y + h * (A71 * k1 + A73 * &k3 + A74 * &k4 + A75 * &k5 + A76 * &k6);
            let k7 = f(xph, &y1);
            self.nfev += 6;

            if !all_finite(&y1) || !all_finite(&k7) {
                return Err(IVPError::NonFiniteState { x: xph });
            }

            let err_vec = h * (E1 * k1 + E3 * &k3 + E4 * &k4 + E5 * &k5 + E6 * &k6 + E7 * &k7);
            let mut err = 0.0;
            for i in 0..n {
                err += (err_vec[i] / self.scale(i, y, &y1)).powi(2);
            }
            err = if n > 0 { (err / n as f64).sqrt() } else { 0.0 };
            if !err.is_finite() {
                return Err(IVPError::NonFiniteState { x: xph });
            }

            let fac11 = err.powf(expo1);
            // Lund stabilization
            let fac = (fac11 / self.facold.powf(BETA)) / SAFETY;
            let fac = fac.clamp(1.0 / FAC_MAX, 1.0 / FAC_MIN);
            let mut h_new = h / fac;

            if err <= 1.0 {
                self.facold = err.max(1e-4);
                self.naccpt += 1;
                let ydiff = &y1 - y;
                let bspl = h * k1 - &ydiff;
                self.cont = [
                    y.clone(),
                    ydiff.clone(),
                    bspl.clone(),
                    &ydiff - h * &k7 - &bspl,
                    h * (D1 * k1 + D3 * &k3 + D4 * &k4 + D5 * &k5 + D6 * &k6 + D7 * &k7),
                ];
                if h_new.abs() > self.h_max {
                    h_new = self.h_max * self.posneg;
                }
                if self.reject {
                    h_new = self.posneg * h_new.abs().min(h.abs());
                }
                self.reject = false;
                self.x_old = x;
                self.x = if last { x_end } else { xph };
                self.y = y1;
                self.k1 = k7;
                self.h = h_new;
                return Ok(());
            }
            h_new = h / (1.0 / FAC_MIN).min(fac11 / SAFETY);
            self.reject = true;
            if self.naccpt >= 1 {
                self.nrejct += 1;
            }
            self.h = h_new;
        }
    }

    /// Dense output inside the last accepted step.
    pub fn interpolate(&self, x: f64) -> DVector<f64> {
        if x == self.x {
            return self.y.clone();
        }
        let h = self.x - self.x_old;
        let theta = (x - self.x_old) / h;
        let theta1 = 1.0 - theta;
        let [c0, c1, c2, c3, c4] = &self.cont;
        c0 + theta * (c1 + theta1 * (c2 + theta * (c3 + theta1 * c4)))
    }
}

//////////////////////////////////////////////////////////////////////////////////////////////
//                       CLASSIC RK4
//////////////////////////////////////////////////////////////////////////////////////////////

/// Fixed-step 4th-order Runge-Kutta stepper.
///
/// The main state only moves along the lattice x0 + k*h. Points between two nodes are reached by a
/// shortened step from the preceding node ([`RK4::sample`]), which leaves the lattice state alone,
/// so the value at any node does not depend on which points are sampled.
pub struct RK4<'a, F>
where
    F: Fn(f64, &DVector<f64>) -> DVector<f64>,
{
    f: &'a F,
    pub x: f64,
    pub y: DVector<f64>,
    pub nfev: usize,
    pub naccpt: usize,
}

impl<'a, F> RK4<'a, F>
where
    F: Fn(f64, &DVector<f64>) -> DVector<f64>,
{
    pub fn new(f: &'a F, x0: f64, y0: DVector<f64>) -> Self {
        RK4 {
            f,
            x: x0,
            y: y0,
            nfev: 0,
            naccpt: 0,
        }
    }

    fn increment(&mut self, h: f64) -> Result<DVector<f64>, IVPError> {
        let f = self.f;
        let (x, y) = (self.x, &self.y);
        let k1 = f(x, y);
        let k2 = f(x + h / 2.0, &(y + (h / 2.0) * &k1));
        let k3 = f(x + h / 2.0, &(y + (h / 2.0) * &k2));
        let k4 = f(x + h, &(y + h * &k3));
        let y_next = y + (h / 6.0) * (k1 + 2.0 * k2 + 2.0 * k3 + k4);
        self.nfev += 4;
        if !all_finite(&y_next) {
            return Err(IVPError::NonFiniteState { x: x + h });
        }
        Ok(y_next)
    }

    /// Full lattice step of size `h`; the coordinate is set to `x_node` to avoid drift.
    pub fn step(&mut self, h: f64, x_node: f64) -> Result<(), IVPError> {
        self.y = self.increment(h)?;
        self.x = x_node;
        self.naccpt += 1;
        Ok(())
    }

    /// State at `x` reached by one step from the current node; the node is kept.
    pub fn sample(&mut self, x: f64) -> Result<DVector<f64>, IVPError> {
        if x == self.x {
            return Ok(self.y.clone());
        }
        self.increment(x - self.x)
    }
}

//////////////////////////////////////////////////////////////////////////////////////////////
//                       DRIVERS
//////////////////////////////////////////////////////////////////////////////////////////////

/// Solve dy/dx = f(x, y) with y(t_eval[0]) = y0 and sample the solution at every
/// point of `t_eval`.
pub fn solve_ivp<F>(
    f: &F,
    y0: DVector<f64>,
    t_eval: &DVector<f64>,
    options: &IVPOptions,
) -> Result<IVPSolution, IVPError>
where
    F: Fn(f64, &DVector<f64>) -> DVector<f64>,
{
    options.check()?;
    check_grid(t_eval)?;
    let n_points = t_eval.len();
    let x0 = t_eval[0];
    let x_end = t_eval[n_points - 1];
    let mut y_result = DMatrix::zeros(n_points, y0.len());
    y_result.set_row(0, &y0.transpose());
    debug!(
        "solve_ivp: method={:?}, x0={}, x_end={}, points={}",
        options.method, x0, x_end, n_points
    );
    if n_points == 1 {
        return Ok(IVPSolution {
            t: t_eval.clone(),
            y: y_result,
            nfev: 0,
            naccpt: 0,
            nrejct: 0,
        });
    }

    match options.method {
        IntegrationMethod::DOPRI5 => {
            let mut stepper = DormandPrince::new(f, x0, y0, x_end, options)?;
            let mut next = 1;
            let mut steps = 0;
            while next < n_points {
                if steps >= options.max_steps {
                    warn!("DOPRI5 stopped at x = {}: step budget exhausted", stepper.x);
                    return Err(IVPError::TooManySteps {
                        x: stepper.x,
                        max_steps: options.max_steps,
                    });
                }
                stepper.step(x_end)?;
                steps += 1;
                let posneg = (x_end - x0).signum();
                while next < n_points && (t_eval[next] - stepper.x) * posneg <= 0.0 {
                    let state = stepper.interpolate(t_eval[next]);
                    y_result.set_row(next, &state.transpose());
                    next += 1;
                }
            }
            debug!(
                "DOPRI5 finished: nfev={}, accepted={}, rejected={}",
                stepper.nfev, stepper.naccpt, stepper.nrejct
            );
            Ok(IVPSolution {
                t: t_eval.clone(),
                y: y_result,
                nfev: stepper.nfev,
                naccpt: stepper.naccpt,
                nrejct: stepper.nrejct,
            })
        }
        IntegrationMethod::RK4 => {
            let span = x_end - x0;
            let posneg = span.signum();
            let n_sub = (span.abs() / options.rk4_step).ceil().max(1.0) as usize;
            if n_sub > options.max_steps {
                warn!("RK4 needs {} steps, budget is {}", n_sub, options.max_steps);
                return Err(IVPError::TooManySteps {
                    x: x0,
                    max_steps: options.max_steps,
                });
            }
            let h = span / n_sub as f64;
            let mut stepper = RK4::new(f, x0, y0);
            let mut next = 1;
            for k in 1..=n_sub {
                let x_node = if k == n_sub {
                    x_end
                } else {
                    x0 + h * k as f64
                };
                while next < n_points && (x_node - t_eval[next]) * posneg > 0.0 {
                    let state = stepper.sample(t_eval[next])?;
                    y_result.set_row(next, &state.transpose());
                    next += 1;
                }
                stepper.step(h, x_node)?;
                while next < n_points && t_eval[next] == x_node {
                    y_result.set_row(next, &stepper.y.transpose());
                    next += 1;
                }
            }
            Ok(IVPSolution {
                t: t_eval.clone(),
                y: y_result,
                nfev: stepper.nfev,
                naccpt: stepper.naccpt,
                nrejct: 0,
            })
        }
    }
}

/// State at `x_end` only.
pub fn solve_ivp_endpoint<F>(
    f: &F,
    x0: f64,
    y0: DVector<f64>,
    x_end: f64,
    options: &IVPOptions,
) -> Result<DVector<f64>, IVPError>
where
    F: Fn(f64, &DVector<f64>) -> DVector<f64>,
{
    if x0 == x_end {
        options.check()?;
        return Ok(y0);
    }
    let t_eval = DVector::from_vec(vec![x0, x_end]);
    let sol = solve_ivp(f, y0, &t_eval, options)?;
    Ok(sol.last_state())
}

/////////////////////////////////////////////////////////////////////////
//          tests
//////////////////////////////////////////////////////////////////////////
