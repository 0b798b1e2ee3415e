//! Configuration system
//!
//! - `macros`: the `config_struct!` declaration macro
//! - `schemas`: every config struct with its defaults
//! - `utils`: loading and global access helpers for the binary

pub mod macros;
pub mod schemas;
pub mod utils;

pub use schemas::{AuthConfig, Config, RealtimeConfig};
pub use utils::{
    get_config_clone, load_config, load_config_from_path, with_config, CONFIG_FILE_PATH,
};
