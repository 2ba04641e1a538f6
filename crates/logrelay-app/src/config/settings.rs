//! Settings parser for .logrelay/config.toml

use std::path::{Path, PathBuf};

use super::types::Settings;
use logrelay_core::prelude::*;

const CONFIG_FILENAME: &str = "config.toml";
const LOGRELAY_DIR: &str = ".logrelay";

const DEFAULT_CONFIG: &str = r#"# logrelay configuration

[relay]
poll_interval_ms = 50       # Delay between copy passes once the log exists
detect_interval_ms = 50     # Delay between checks while waiting for the log
grace_period_ms = 1000      # Keep tailing this long after the process exits
pipe_capacity = 65536       # Bytes buffered between tailer and console
truncation = "restart"      # "restart": reread a shrunk log from its start
                            # "hold": wait until it grows past the old end

[log]
# Log file to follow. Leave unset to use `-logFile` from the command line
# or the platform's default Editor.log location.
# path = "/path/to/Editor.log"
annotate = true             # Classify lines and print a severity summary
locality = "local"          # "remote" routes bytes through a forwarding link
"#;

/// Path of the config file for `project_path`
pub fn config_path(project_path: &Path) -> PathBuf {
    project_path.join(LOGRELAY_DIR).join(CONFIG_FILENAME)
}

/// Load settings from .logrelay/config.toml
///
/// A missing, unreadable or malformed file yields defaults.
pub fn load_settings(project_path: &Path) -> Settings {
    let config_path = config_path(project_path);

    if !config_path.exists() {
        debug!("No config file at {:?}, using defaults", config_path);
        return Settings::default();
    }

    match std::fs::read_to_string(&config_path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(settings) => {
                debug!("Loaded settings from {:?}", config_path);
                settings
            }
            Err(e) => {
                warn!("Failed to parse {:?}: {}", config_path, e);
                Settings::default()
            }
        },
        Err(e) => {
            warn!("Failed to read {:?}: {}", config_path, e);
            Settings::default()
        }
    }
}

/// Create a commented default config in .logrelay/
///
/// An existing config file is left untouched. Returns the config path.
pub fn init_config_dir(project_path: &Path) -> Result<PathBuf> {
    let logrelay_dir = project_path.join(LOGRELAY_DIR);

    if !logrelay_dir.exists() {
        std::fs::create_dir_all(&logrelay_dir)
            .map_err(|e| Error::config(format!("Failed to create .logrelay dir: {}", e)))?;
    }

    let config_path = logrelay_dir.join(CONFIG_FILENAME);
    if !config_path.exists() {
        std::fs::write(&config_path, DEFAULT_CONFIG)
            .map_err(|e| Error::config(format!("Failed to write config.toml: {}", e)))?;
        info!("Created default config at {:?}", config_path);
    } else {
        debug!("Config already present at {:?}", config_path);
    }

    Ok(config_path)
}
