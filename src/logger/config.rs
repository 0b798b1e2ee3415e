/// Logger configuration and flag-driven filtering rules
use once_cell::sync::Lazy;
use std::sync::RwLock;

use crate::arguments;
use super::levels::LogLevel;
use super::tags::LogTag;

/// Runtime logger configuration
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Minimum level to display (Error is always shown)
    pub min_level: LogLevel,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
        }
    }
}

static LOGGER_CONFIG: Lazy<RwLock<LoggerConfig>> =
    Lazy::new(|| RwLock::new(LoggerConfig::default()));

/// Get a copy of the current logger configuration
pub fn get_logger_config() -> LoggerConfig {
    LOGGER_CONFIG
        .read()
        .map(|cfg| cfg.clone())
        .unwrap_or_default()
}

/// Replace the logger configuration (used by tests and init)
pub fn set_logger_config(config: LoggerConfig) {
    if let Ok(mut cfg) = LOGGER_CONFIG.write() {
        *cfg = config;
    }
}

/// Initialize logger configuration from command-line arguments
///
/// --log-level <level> sets the threshold directly; otherwise --verbose
/// raises it to Verbose and --quiet lowers it to Warning.
pub fn init_from_args() {
    let explicit = arguments::get_arg_value("--log-level")
        .and_then(|level| LogLevel::from_str(&level));

    let min_level = if let Some(level) = explicit {
        level
    } else if arguments::is_verbose_enabled() {
        LogLevel::Verbose
    } else if arguments::has_arg("--quiet") {
        LogLevel::Warning
    } else {
        LogLevel::Info
    };

    set_logger_config(LoggerConfig { min_level });
}

/// Check whether debug output is enabled for a tag via --debug-<module>
pub fn is_debug_enabled_for_tag(tag: &LogTag) -> bool {
    if arguments::has_arg("--debug-all") {
        return true;
    }
    arguments::has_arg(&format!("--debug-{}", tag.to_debug_key()))
}
