/// Configuration utilities - loading and access helpers
///
/// Used by the binary only; the library never reads the global config. Pools
/// receive their `RealtimeConfig`/`AuthConfig` by value so independent pool
/// instances stay independently configurable in tests.
use super::schemas::Config;
use once_cell::sync::OnceCell;
use std::sync::RwLock;

/// Global configuration instance (binary-side single source of truth)
pub static CONFIG: OnceCell<RwLock<Config>> = OnceCell::new();

/// Default configuration file path
pub const CONFIG_FILE_PATH: &str = "data/config.toml";

/// Load configuration from disk and initialize the global CONFIG
///
/// Should be called once at startup. If the config file doesn't exist,
/// defaults from the schema definitions are used.
pub fn load_config() -> Result<(), String> {
    load_config_from_path(CONFIG_FILE_PATH)
}

/// Load configuration from a specific file path
pub fn load_config_from_path(path: &str) -> Result<(), String> {
    let config = if std::path::Path::new(path).exists() {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file '{}': {}", path, e))?;

        toml::from_str::<Config>(&contents)
            .map_err(|e| format!("Failed to parse config file '{}': {}", path, e))?
    } else {
        Config::default()
    };

    match CONFIG.get() {
        Some(lock) => {
            let mut current = lock
                .write()
                .map_err(|e| format!("Failed to acquire config write lock: {}", e))?;
            *current = config;
        }
        None => {
            CONFIG
                .set(RwLock::new(config))
                .map_err(|_| "Config already initialized".to_string())?;
        }
    }

    Ok(())
}

/// Execute a function with read access to the configuration
///
/// This is the recommended way to read configuration values.
pub fn with_config<F, R>(f: F) -> R
where
    F: FnOnce(&Config) -> R,
{
    let config_lock = CONFIG
        .get()
        .expect("Config not initialized. Call load_config() first.");

    let config = config_lock
        .read()
        .expect("Failed to acquire config read lock");

    f(&config)
}

/// Get a clone of the entire configuration
///
/// Useful when config values are needed across await points.
pub fn get_config_clone() -> Config {
    with_config(|cfg| cfg.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_file_missing() {
        load_config_from_path("/nonexistent/config.toml").unwrap();
        let attempts = with_config(|cfg| cfg.realtime.reconnect_max_attempts);
        assert_eq!(attempts, 5);
    }

    #[test]
    fn test_parse_partial_toml() {
        let cfg: Config = toml::from_str(
            r#"
            [realtime]
            keepalive_interval_secs = 5

            [auth]
            token = "abc123"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.realtime.keepalive_interval_secs, 5);
        assert_eq!(cfg.realtime.acquire_timeout_secs, 10);
        assert_eq!(cfg.auth.token.as_deref(), Some("abc123"));
    }
}
