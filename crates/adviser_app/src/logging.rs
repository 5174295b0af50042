//! Logger setup for the bot process.
//!
//! File output goes to `./read-adviser.log` in the current working directory.
//! Records from our own crates follow the chosen level; records from
//! dependencies (reqwest, hyper, rusqlite) only show from warn up.

use std::fs::{File, OpenOptions};
use std::path::PathBuf;

use clap::ValueEnum;
use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};

const LOG_FILE: &str = "./read-adviser.log";
const OWN_TARGETS: [&str; 2] = ["adviser", "read_adviser"];
const DEPENDENCY_LEVEL: LevelFilter = LevelFilter::Warn;

/// Destination for log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogDestination {
    /// Append to ./read-adviser.log.
    File,
    /// Write to the terminal.
    Terminal,
    /// Both of the above.
    Both,
}

/// Installs the global logger. Falls back to terminal-only output if the log
/// file can't be opened.
pub fn initialize(destination: LogDestination, verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();
    if matches!(destination, LogDestination::Terminal | LogDestination::Both) {
        loggers.extend(per_target(level, terminal_logger));
    }
    if matches!(destination, LogDestination::File | LogDestination::Both) {
        match open_log_file() {
            Some(file) => loggers.extend(per_target(level, |level, config| {
                file_logger(level, config, &file)
            })),
            None if loggers.is_empty() => loggers.extend(per_target(level, terminal_logger)),
            None => {}
        }
    }

    let _ = CombinedLogger::init(loggers);
}

/// One logger for our own targets at `level`, one for everything else at
/// [`DEPENDENCY_LEVEL`].
fn per_target<F>(level: LevelFilter, mut make: F) -> Vec<Box<dyn SharedLogger>>
where
    F: FnMut(LevelFilter, Config) -> Box<dyn SharedLogger>,
{
    let mut own = base_config();
    let mut dependencies = base_config();
    for target in OWN_TARGETS {
        own.add_filter_allow_str(target);
        dependencies.add_filter_ignore_str(target);
    }
    vec![
        make(level, own.build()),
        make(DEPENDENCY_LEVEL.min(level), dependencies.build()),
    ]
}

fn base_config() -> ConfigBuilder {
    let mut builder = ConfigBuilder::new();
    builder
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error);
    builder
}

fn terminal_logger(level: LevelFilter, config: Config) -> Box<dyn SharedLogger> {
    TermLogger::new(level, config, TerminalMode::Mixed, ColorChoice::Auto)
}

fn file_logger(level: LevelFilter, config: Config, file: &File) -> Box<dyn SharedLogger> {
    match file.try_clone() {
        Ok(handle) => WriteLogger::new(level, config, handle),
        Err(err) => {
            eprintln!("Warning: Could not share log file handle: {}", err);
            terminal_logger(level, config)
        }
    }
}

fn open_log_file() -> Option<File> {
    let log_path = PathBuf::from(LOG_FILE);
    match OpenOptions::new().create(true).append(true).open(&log_path) {
        Ok(file) => Some(file),
        Err(err) => {
            eprintln!("Warning: Could not open log file at {:?}: {}", log_path, err);
            None
        }
    }
}
