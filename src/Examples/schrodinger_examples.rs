use crate::Utils::logger::save_trajectory_to_csv;
use crate::Utils::logging::log_summary;
use crate::Utils::task_config::TaskConfig;
use crate::numerical::NonStiff_api::{IVPOptions, IntegrationMethod};
use crate::numerical::Schrodinger::fixed_energy::FixedEnergyTask;
use crate::numerical::Schrodinger::potential::PotentialParams;
use crate::numerical::ShootingBVP::Shooting_eigen::{
    BoundaryValueProblem, EigenSolution, InitialSlope, ShootingMethodSolver,
};
use log::info;
use std::error::Error;
use std::path::Path;

/// Runs every enabled component of the task and writes plots/CSV into the output directory.
pub fn run_task(task: &TaskConfig) -> Result<Option<EigenSolution>, Box<dyn Error>> {
    let out = &task.output;
    if (out.plots || out.csv) && !out.dir.as_os_str().is_empty() {
        std::fs::create_dir_all(&out.dir)?;
    }

    if task.run_fixed_energy {
        let fixed = &task.fixed_energy;
        let trajectory = fixed.solve()?;
        if out.plots {
            fixed.plot(&trajectory, &out.dir)?;
        }
        if out.csv {
            save_trajectory_to_csv(&trajectory, &out.dir.join("fixed_energy.csv"))?;
        }
        let rows = vec![
            ("energy".to_string(), fixed.energy.to_string()),
            ("points".to_string(), trajectory.len().to_string()),
            ("nodes".to_string(), trajectory.node_count().to_string()),
            (
                "psi at right end".to_string(),
                trajectory
                    .last()
                    .map(|(_, psi, _)| format!("{:.6e}", psi))
                    .unwrap_or_default(),
            ),
        ];
        log_summary("FIXED ENERGY RESULT", &rows);
    }

    if !task.run_shooting {
        return Ok(None);
    }
    let mut solver = task.shooting_solver();
    let solution = solver.solve()?;
    if out.plots {
        solver.plot(&solution, &out.dir)?;
    }
    if out.csv {
        save_trajectory_to_csv(&solution.trajectory, &out.dir.join("shooting.csv"))?;
    }
    info!("results written to {}", out.dir.display());
    Ok(Some(solution))
}

/// 0: fixed energy, 1: shooting, 2: shooting with a constant initial slope, 3: shooting with RK4
pub fn schrodinger_examples(example: usize, output: Option<&Path>) -> Result<(), Box<dyn Error>> {
    match example {
        0 => {
            let task = FixedEnergyTask::default();
            let trajectory = task.solve()?;
            println!(
                "fixed energy E = {}: psi(y0) = {:?}, psi(y_end) = {:?}, nodes = {}",
                task.energy,
                trajectory.first(),
                trajectory.last(),
                trajectory.node_count()
            );
            if let Some(dir) = output {
                task.plot(&trajectory, dir)?;
            }
        }
        1 => {
            let mut solver =
                ShootingMethodSolver::new(PotentialParams::default(), BoundaryValueProblem::default());
            let solution = solver.solve()?;
            println!(
                "E = {}, residual = {}, iterations = {}, status = {}",
                solution.energy, solution.residual, solution.iterations, solution.status
            );
            if let Some(dir) = output {
                solver.plot(&solution, dir)?;
            }
        }
        2 => {
            // psi'(a) no longer follows the trial energy
            let problem = BoundaryValueProblem {
                b: 4.0,
                ..BoundaryValueProblem::default()
            };
            let mut solver = ShootingMethodSolver::new(PotentialParams::default(), problem);
            solver.slope = InitialSlope::Fixed(1.0);
            let solution = solver.solve()?;
            println!(
                "fixed slope: E = {}, residual = {}, status = {}, nodes = {}",
                solution.energy,
                solution.residual,
                solution.status,
                solution.trajectory.node_count()
            );
            if let Some(dir) = output {
                solver.plot(&solution, dir)?;
            }
        }
        3 => {
            let problem = BoundaryValueProblem {
                a: 0.01,
                b: 4.0,
                ..BoundaryValueProblem::default()
            };
            let mut solver = ShootingMethodSolver::new(PotentialParams::default(), problem);
            solver.ivp_options = IVPOptions::with_method(IntegrationMethod::RK4);
            solver.ivp_options.rk4_step = 1e-3;
            solver.config.max_iterations = 100;
            let solution = solver.solve()?;
            println!(
                "RK4: E = {}, residual = {}, status = {}",
                solution.energy, solution.residual, solution.status
            );
            if let Some(dir) = output {
                solver.plot(&solution, dir)?;
            }
        }
        _ => println!("example {} not found, choose 0..=3", example),
    }
    Ok(())
}
