/// Centralized argument handling for missionsync
///
/// Consolidates command-line argument parsing and debug flag checking so the
/// logger and modules read flags from one place instead of re-scanning
/// `env::args()` everywhere.
///
/// Features:
/// - Centralized CMD_ARGS storage with thread-safe access
/// - Debug flag checking functions for all modules
/// - Simple flag/value lookup utilities shared by the binary and tests
use once_cell::sync::Lazy;
use std::env;
use std::sync::Mutex;

/// Global command-line arguments storage
pub static CMD_ARGS: Lazy<Mutex<Vec<String>>> = Lazy::new(|| Mutex::new(env::args().collect()));

/// Sets the global command-line arguments
/// Used by tests to override the default env::args() collection
pub fn set_cmd_args(args: Vec<String>) {
    if let Ok(mut cmd_args) = CMD_ARGS.lock() {
        *cmd_args = args;
    }
}

/// Gets a copy of the current command-line arguments
pub fn get_cmd_args() -> Vec<String> {
    match CMD_ARGS.lock() {
        Ok(args) => args.clone(),
        Err(_) => env::args().collect(),
    }
}

/// Checks if a specific argument is present in the command line
pub fn has_arg(arg: &str) -> bool {
    get_cmd_args()
        .iter()
        .any(|a| a == arg)
}

/// Gets the value of a command-line argument that follows a flag
/// Returns None if the flag is not found or has no value
pub fn get_arg_value(flag: &str) -> Option<String> {
    let args = get_cmd_args();
    for (i, arg) in args.iter().enumerate() {
        if arg == flag && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
    }
    None
}

/// Collects every value following repeated occurrences of a flag
/// e.g. `--topic m1 --topic m2` returns ["m1", "m2"]
pub fn get_arg_values(flag: &str) -> Vec<String> {
    let args = get_cmd_args();
    let mut values = Vec::new();
    for (i, arg) in args.iter().enumerate() {
        if arg == flag && i + 1 < args.len() {
            values.push(args[i + 1].clone());
        }
    }
    values
}

// =============================================================================
// DEBUG FLAG CHECKING FUNCTIONS
// These functions check for specific debug flags in the command-line arguments
// =============================================================================

/// Checks if pool/connection lifecycle debugging is enabled (--debug-pool)
pub fn is_debug_pool_enabled() -> bool {
    has_arg("--debug-pool") || has_arg("--debug-all")
}

/// Checks if wire-level frame debugging is enabled (--debug-realtime)
pub fn is_debug_realtime_enabled() -> bool {
    has_arg("--debug-realtime") || has_arg("--debug-all")
}

/// Checks if topic routing/processor debugging is enabled (--debug-topics)
pub fn is_debug_topics_enabled() -> bool {
    has_arg("--debug-topics") || has_arg("--debug-all")
}

/// Checks if verbose logging is enabled (--verbose)
pub fn is_verbose_enabled() -> bool {
    has_arg("--verbose")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arg_value_lookup() {
        set_cmd_args(vec![
            "missionsync".to_string(),
            "--endpoint".to_string(),
            "ws://localhost:9300/ws".to_string(),
            "--topic".to_string(),
            "m1".to_string(),
            "--topic".to_string(),
            "m2".to_string(),
        ]);

        assert_eq!(
            get_arg_value("--endpoint"),
            Some("ws://localhost:9300/ws".to_string())
        );
        assert_eq!(get_arg_values("--topic"), vec!["m1", "m2"]);
        assert!(!has_arg("--debug-pool"));
    }
}
