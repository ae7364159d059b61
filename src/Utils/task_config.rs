//! Typed run configuration built from a task document (see [`crate::Utils::task_parser`]).
//!
//! ```text
//! potential
//! V0: 1.0
//! C: 1.0
//! a: 1.0
//! fixed_energy
//! energy: 0.01
//! initial_state: -1.0, 1.0
//! domain: 0.001, 4.0
//! n_points: 2000
//! shooting
//! a: 0.001
//! b: 10.0
//! alpha: -1.0
//! beta: 0.0
//! bracket: 0.0, 3.0
//! tolerance: 1e-6
//! max_iterations: 1000
//! slope: coupled
//! solver
//! method: DOPRI5
//! rtol: 1e-9
//! output
//! dir: results
//! log_level: info
//! ```
//! Every key is optional; absent keys keep their defaults.
use crate::Utils::logging::{LogSettings, level_from_name};
use crate::Utils::task_parser::{Value, parse_document_as};
use crate::numerical::NonStiff_api::{IVPOptions, IntegrationMethod};
use crate::numerical::Schrodinger::fixed_energy::FixedEnergyTask;
use crate::numerical::Schrodinger::potential::PotentialParams;
use crate::numerical::ShootingBVP::Shooting_eigen::{
    BoundaryValueProblem, InitialSlope, ShootingMethodSolver,
};
use crate::numerical::ShootingBVP::bisection::BisectionConfig;
use std::fmt;
use std::path::{Path, PathBuf};
use strum::IntoEnumIterator;

#[derive(Debug, Clone, PartialEq)]
pub enum TaskError {
    Io(String),
    Parse(String),
    UnknownSection(String),
    UnknownKey { section: String, key: String },
    BadValue { section: String, key: String, msg: String },
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TaskError::Io(msg) => write!(f, "Cannot read task file: {}", msg),
            TaskError::Parse(msg) => write!(f, "Cannot parse task file: {}", msg),
            TaskError::UnknownSection(s) => write!(f, "Unknown section '{}'", s),
            TaskError::UnknownKey { section, key } => {
                write!(f, "Unknown key '{}' in section '{}'", key, section)
            }
            TaskError::BadValue { section, key, msg } => {
                write!(f, "Bad value for '{}' in section '{}': {}", key, section, msg)
            }
        }
    }
}

impl std::error::Error for TaskError {}

/// Where and what to write
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSettings {
    pub dir: PathBuf,
    pub plots: bool,
    pub csv: bool,
    pub log: LogSettings,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("results"),
            plots: true,
            csv: true,
            log: LogSettings::default(),
        }
    }
}

/// Shooting part of the task
#[derive(Debug, Clone)]
pub struct ShootingSettings {
    pub problem: BoundaryValueProblem,
    pub search: BisectionConfig,
    pub n_points: usize,
    pub slope: InitialSlope,
    pub display_max: f64,
}

impl Default for ShootingSettings {
    fn default() -> Self {
        Self {
            problem: BoundaryValueProblem::default(),
            search: BisectionConfig::default(),
            n_points: 3000,
            slope: InitialSlope::EnergyCoupled,
            display_max: 4.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TaskConfig {
    pub params: PotentialParams,
    pub run_fixed_energy: bool,
    pub fixed_energy: FixedEnergyTask,
    pub run_shooting: bool,
    pub shooting: ShootingSettings,
    pub ivp_options: IVPOptions,
    pub output: OutputSettings,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            params: PotentialParams::default(),
            run_fixed_energy: true,
            fixed_energy: FixedEnergyTask::default(),
            run_shooting: true,
            shooting: ShootingSettings::default(),
            ivp_options: IVPOptions::default(),
            output: OutputSettings::default(),
        }
    }
}

/// key lookup context for error messages
struct Entry<'a> {
    section: &'a str,
    key: &'a str,
    values: &'a [Value],
}

impl<'a> Entry<'a> {
    fn bad(&self, msg: &str) -> TaskError {
        TaskError::BadValue {
            section: self.section.to_string(),
            key: self.key.to_string(),
            msg: msg.to_string(),
        }
    }

    fn single(&self) -> Result<&'a Value, TaskError> {
        match self.values {
            [v] => Ok(v),
            _ => Err(self.bad(&format!("expected 1 value, got {}", self.values.len()))),
        }
    }

    fn float(&self) -> Result<f64, TaskError> {
        self.single()?
            .as_float()
            .ok_or_else(|| self.bad("expected a number"))
    }

    fn pair(&self) -> Result<(f64, f64), TaskError> {
        match self.values {
            [a, b] => match (a.as_float(), b.as_float()) {
                (Some(a), Some(b)) => Ok((a, b)),
                _ => Err(self.bad("expected two numbers")),
            },
            _ => Err(self.bad(&format!("expected 2 values, got {}", self.values.len()))),
        }
    }

    fn count(&self) -> Result<usize, TaskError> {
        let v = self
            .single()?
            .as_integer()
            .ok_or_else(|| self.bad("expected an integer"))?;
        usize::try_from(v).map_err(|_| self.bad("expected a non-negative integer"))
    }

    fn boolean(&self) -> Result<bool, TaskError> {
        self.single()?
            .as_boolean()
            .ok_or_else(|| self.bad("expected true or false"))
    }

    fn text(&self) -> Result<String, TaskError> {
        Ok(self.single()?.to_string())
    }

    fn unknown(&self) -> TaskError {
        TaskError::UnknownKey {
            section: self.section.to_string(),
            key: self.key.to_string(),
        }
    }
}

impl TaskConfig {
    pub fn from_file(path: &Path) -> Result<Self, TaskError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| TaskError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_text(&text)
    }

    pub fn from_text(text: &str) -> Result<Self, TaskError> {
        let document = parse_document_as(text).map_err(TaskError::Parse)?;
        let mut task = TaskConfig::default();
        let mut sections: Vec<&String> = document.keys().collect();
        sections.sort();
        for section in sections {
            let mut keys: Vec<(&String, &Option<Vec<Value>>)> = document[section].iter().collect();
            keys.sort_by(|x, y| x.0.cmp(y.0));
            for (key, values) in keys {
                let values: &[Value] = values.as_deref().unwrap_or(&[]);
                let entry = Entry {
                    section,
                    key,
                    values,
                };
                task.apply(&entry)?;
            }
        }
        task.fixed_energy.params = task.params;
        task.fixed_energy.ivp_options = task.ivp_options.clone();
        Ok(task)
    }

    fn apply(&mut self, e: &Entry) -> Result<(), TaskError> {
        match e.section {
            "potential" => match e.key {
                "V0" => self.params.V0 = e.float()?,
                "C" => {
                    let c = e.float()?;
                    if c == 0.0 {
                        return Err(e.bad("C must be non-zero"));
                    }
                    self.params.C = c;
                }
                "a" => self.params.a = e.float()?,
                _ => return Err(e.unknown()),
            },
            "fixed_energy" => match e.key {
                "run" => self.run_fixed_energy = e.boolean()?,
                "energy" => self.fixed_energy.energy = e.float()?,
                "initial_state" => self.fixed_energy.initial_state = e.pair()?,
                "domain" => self.fixed_energy.domain = e.pair()?,
                "n_points" => self.fixed_energy.n_points = e.count()?,
                _ => return Err(e.unknown()),
            },
            "shooting" => match e.key {
                "run" => self.run_shooting = e.boolean()?,
                "a" => self.shooting.problem.a = e.float()?,
                "b" => self.shooting.problem.b = e.float()?,
                "alpha" => self.shooting.problem.alpha = e.float()?,
                "beta" => self.shooting.problem.beta = e.float()?,
                "bracket" => self.shooting.search.bracket = e.pair()?,
                "tolerance" => self.shooting.search.tolerance = e.float()?,
                "max_iterations" => self.shooting.search.max_iterations = e.count()?,
                "n_points" => self.shooting.n_points = e.count()?,
                "display_max" => self.shooting.display_max = e.float()?,
                "slope" => {
                    let v = e.single()?;
                    self.shooting.slope = match (v.as_string(), v.as_float()) {
                        (Some(s), _) if s == "coupled" => InitialSlope::EnergyCoupled,
                        (_, Some(s)) => InitialSlope::Fixed(s),
                        _ => return Err(e.bad("expected 'coupled' or a number")),
                    };
                }
                _ => return Err(e.unknown()),
            },
            "solver" => match e.key {
                "method" => {
                    let name = e.text()?;
                    self.ivp_options.method = IntegrationMethod::from_name(&name)
                        .ok_or_else(|| {
                            let known: Vec<IntegrationMethod> = IntegrationMethod::iter().collect();
                            e.bad(&format!("unknown method {}, expected one of {:?}", name, known))
                        })?;
                }
                "rtol" => self.ivp_options.rtol = e.float()?,
                "atol" => self.ivp_options.atol = e.float()?,
                "first_step" => self.ivp_options.first_step = Some(e.float()?),
                "max_step" => self.ivp_options.max_step = Some(e.float()?),
                "max_steps" => self.ivp_options.max_steps = e.count()?,
                "rk4_step" => self.ivp_options.rk4_step = e.float()?,
                _ => return Err(e.unknown()),
            },
            "output" => match e.key {
                "dir" => self.output.dir = PathBuf::from(e.text()?),
                "plots" => self.output.plots = e.boolean()?,
                "csv" => self.output.csv = e.boolean()?,
                "log_level" => {
                    let name = e.text()?;
                    self.output.log.level = level_from_name(&name)
                        .ok_or_else(|| e.bad(&format!("unknown log level {}", name)))?;
                }
                "log_to_console" => self.output.log.to_console = e.boolean()?,
                "log_to_file" => self.output.log.to_file = e.boolean()?,
                _ => return Err(e.unknown()),
            },
            other => return Err(TaskError::UnknownSection(other.to_string())),
        }
        Ok(())
    }

    pub fn shooting_solver(&self) -> ShootingMethodSolver {
        let mut solver = ShootingMethodSolver::new(self.params, self.shooting.problem);
        solver.config = self.shooting.search.clone();
        solver.n_points = self.shooting.n_points;
        solver.slope = self.shooting.slope;
        solver.display_max = self.shooting.display_max;
        solver.ivp_options = self.ivp_options.clone();
        solver
    }
}
