#![deny(missing_docs)]
//! Shared logging utilities for the read adviser workspace.
//!
//! This crate provides the `adviser_*` logging macros used by the engine and
//! the binary, and a minimal test initializer for the global logger. The
//! binary decides where records go; library crates only emit them.

/// Per-request detail, off unless the binary asks for it.
#[macro_export]
macro_rules! adviser_trace {
    ($($arg:tt)*) => {{
        log::trace!($($arg)*);
    }};
}

/// Store and client internals; shown with `--verbose`.
#[macro_export]
macro_rules! adviser_debug {
    ($($arg:tt)*) => {{
        log::debug!($($arg)*);
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! adviser_info {
    ($($arg:tt)*) => {{
        log::info!($($arg)*);
    }};
}

/// Something retried or skipped that an operator may want to see.
#[macro_export]
macro_rules! adviser_warn {
    ($($arg:tt)*) => {{
        log::warn!($($arg)*);
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! adviser_error {
    ($($arg:tt)*) => {{
        log::error!($($arg)*);
    }};
}

/// Terminal logger for integration tests. Later calls in the same test
/// binary keep the first logger.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Another test in the same binary may have installed the logger already.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Never,
    )]);
}
