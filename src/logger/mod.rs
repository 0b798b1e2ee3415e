//! Structured logging for missionsync
//!
//! Clean, ergonomic logging API with:
//! - Automatic debug mode filtering from command-line arguments
//! - Standard log levels (Error/Warning/Info/Debug/Verbose)
//! - Per-module debug control via --debug-<module> flags
//! - Colored console output
//!
//! ## Usage
//!
//! ```rust
//! use missionsync::logger::{self, LogTag};
//!
//! logger::error(LogTag::Pool, "Connection open failed");
//! logger::info(LogTag::Topics, "Subscribed to mission m1");
//! logger::debug(LogTag::Link, "Frame received: ..."); // Only if --debug-realtime
//! ```
//!
//! ## Initialization
//!
//! Call once at startup, before any logging occurs:
//! ```rust
//! missionsync::logger::init();
//! ```

mod config;
mod format;
mod levels;
mod tags;

pub use config::{get_logger_config, init_from_args, set_logger_config, LoggerConfig};
pub use levels::LogLevel;
pub use tags::LogTag;

/// Initialize the logger system
///
/// Scans command-line arguments for --debug-<module> / --verbose / --quiet
/// flags and configures the filtering rules.
pub fn init() {
    config::init_from_args();
}

/// Check if a log message should be displayed
///
/// Filtering rules:
/// 1. Errors are always shown
/// 2. Check against minimum log level threshold
/// 3. Debug level requires the --debug-<module> flag for that tag
/// 4. Verbose level requires the --verbose flag
pub fn should_log(tag: &LogTag, level: LogLevel) -> bool {
    let config = get_logger_config();

    if level == LogLevel::Error {
        return true;
    }

    if level > config.min_level && level != LogLevel::Debug {
        return false;
    }

    if level == LogLevel::Debug {
        return config::is_debug_enabled_for_tag(tag);
    }

    if level == LogLevel::Verbose {
        return config.min_level == LogLevel::Verbose;
    }

    true
}

fn log_internal(tag: LogTag, level: LogLevel, message: &str) {
    if !should_log(&tag, level) {
        return;
    }
    format::format_and_log(tag, level, message);
}

/// Log at ERROR level (always shown, critical issues)
pub fn error(tag: LogTag, message: &str) {
    log_internal(tag, LogLevel::Error, message);
}

/// Log at WARNING level (important issues that need attention)
pub fn warning(tag: LogTag, message: &str) {
    log_internal(tag, LogLevel::Warning, message);
}

/// Log at INFO level (standard operational messages)
pub fn info(tag: LogTag, message: &str) {
    log_internal(tag, LogLevel::Info, message);
}

/// Log at DEBUG level (detailed diagnostics)
///
/// Only shown when the matching --debug-<module> flag is provided.
pub fn debug(tag: LogTag, message: &str) {
    log_internal(tag, LogLevel::Debug, message);
}

/// Log at VERBOSE level (very detailed tracing, gated by --verbose)
pub fn verbose(tag: LogTag, message: &str) {
    log_internal(tag, LogLevel::Verbose, message);
}
