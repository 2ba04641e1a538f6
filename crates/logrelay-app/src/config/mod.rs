//! Configuration file parsing for logrelay
//!
//! Supports `.logrelay/config.toml` in the working directory. Command-line
//! flags override what the file sets.

pub mod settings;
pub mod types;

pub use settings::{config_path, init_config_dir, load_settings};
pub use types::*;
