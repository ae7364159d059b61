#![allow(non_snake_case)]
use SchrodingerShooting::Examples::schrodinger_examples::run_task;
use SchrodingerShooting::Utils::logging::init_logger;
use SchrodingerShooting::Utils::task_config::TaskConfig;
use log::{error, info};
use std::path::PathBuf;

fn main() {
    // optional argument: path to a task document
    let task_path = std::env::args().nth(1).map(PathBuf::from);
    let task = match &task_path {
        Some(path) => match TaskConfig::from_file(path) {
            Ok(task) => task,
            Err(e) => {
                eprintln!("{}", e);
                std::process::exit(2);
            }
        },
        None => TaskConfig::default(),
    };
    init_logger(&task.output.log);
    match &task_path {
        Some(path) => info!("task loaded from {}", path.display()),
        None => info!("no task document given, running the default task"),
    }
    info!("Schrodinger equation for V(y) = V0*(y^2 - 2y)/C, parameters {:?}", task.params);

    match run_task(&task) {
        Ok(Some(solution)) if !solution.is_converged() => {
            info!(
                "energy search exhausted, final residual {:.3e}",
                solution.residual
            );
        }
        Ok(_) => info!("Program ended"),
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    }
}
