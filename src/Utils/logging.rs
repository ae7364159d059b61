use chrono::Local;
use log::{LevelFilter, info};
use simplelog::*;
use std::fs::File;
use tabled::{builder::Builder, settings::Style};

/// Logger setup: console and/or timestamped file
#[derive(Debug, Clone, PartialEq)]
pub struct LogSettings {
    pub level: LevelFilter,
    pub to_console: bool,
    pub to_file: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: LevelFilter::Info,
            to_console: true,
            to_file: false,
        }
    }
}

pub fn level_from_name(name: &str) -> Option<LevelFilter> {
    match name.to_lowercase().as_str() {
        "off" => Some(LevelFilter::Off),
        "error" => Some(LevelFilter::Error),
        "warn" => Some(LevelFilter::Warn),
        "info" => Some(LevelFilter::Info),
        "debug" => Some(LevelFilter::Debug),
        "trace" => Some(LevelFilter::Trace),
        _ => None,
    }
}

/// log_<date>_<time>.txt
pub fn log_file_name() -> String {
    let date_and_time = Local::now().format("%Y-%m-%d_%H-%M-%S");
    format!("log_{}.txt", date_and_time)
}

/// Installs the global logger. A logger that is already installed is kept.
pub fn init_logger(settings: &LogSettings) {
    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();
    if settings.to_console {
        loggers.push(TermLogger::new(
            settings.level,
            Config::default(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ));
    }
    if settings.to_file {
        match File::create(log_file_name()) {
            Ok(file) => loggers.push(WriteLogger::new(settings.level, Config::default(), file)),
            Err(e) => eprintln!("cannot create log file: {}", e),
        }
    }
    if !loggers.is_empty() {
        let _ = CombinedLogger::init(loggers);
    }
}

/// Renders (name, value) rows as a table and logs it at info level.
pub fn log_summary(title: &str, rows: &[(String, String)]) -> String {
    let mut builder = Builder::default();
    builder.push_record(["parameter", "value"]);
    for (name, value) in rows {
        builder.push_record([name.as_str(), value.as_str()]);
    }
    let mut table = builder.build();
    table.with(Style::modern_rounded());
    let rendered = table.to_string();
    info!("\n \n {} \n \n {}", title, rendered);
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_names() {
        assert_eq!(level_from_name("debug"), Some(LevelFilter::Debug));
        assert_eq!(level_from_name("WARN"), Some(LevelFilter::Warn));
        assert_eq!(level_from_name("loud"), None);
    }

    #[test]
    fn test_log_file_name() {
        let name = log_file_name();
        assert!(name.starts_with("log_"));
        assert!(name.ends_with(".txt"));
        // log_YYYY-mm-dd_HH-MM-SS.txt
        assert_eq!(name.len(), "log_".len() + 19 + ".txt".len());
    }

    #[test]
    fn test_summary_table() {
        let rows = vec![
            ("energy".to_string(), "1.25".to_string()),
            ("status".to_string(), "Converged".to_string()),
        ];
        let table = log_summary("SHOOTING", &rows);
        assert!(table.contains("energy"));
        assert!(table.contains("1.25"));
        assert!(table.contains("Converged"));
    }
}
