//! Configuration for paystrap
//!
//! Locates and loads `paystrap.yaml`, and provides the settings store the
//! bootstrap pipeline forwards credentials to.

pub mod bootstrap;
pub mod error;
pub mod settings;

pub use bootstrap::{BootstrapConfig, PayoutInterval, WebhookConfig};
pub use error::*;
pub use settings::{FileSettingsStore, PaymentSettings, SettingsStore, redact};

use std::path::{Path, PathBuf};

/// Environment variable pointing directly at a config file
pub const CONFIG_PATH_ENV: &str = "PAYSTRAP_CONFIG_PATH";

const APP_DIR: &str = "paystrap";
const CANDIDATES: [&str; 2] = ["paystrap.local.yaml", "paystrap.yaml"];

/// Returns `~/.config/paystrap`, creating it when missing
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join(APP_DIR);

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

/// Find the paystrap.yaml to use
///
/// Search order:
/// 1. `PAYSTRAP_CONFIG_PATH` (direct path)
/// 2. current directory: paystrap.local.yaml, paystrap.yaml
/// 3. `./.paystrap/` with the same order
/// 4. `~/.config/paystrap/paystrap.yaml` (global)
pub fn find_config_file() -> Result<PathBuf> {
    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
    }

    let current_dir = std::env::current_dir()?;

    for filename in &CANDIDATES {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(path);
        }
    }

    let local_dir = current_dir.join(".paystrap");
    if local_dir.is_dir() {
        for filename in &CANDIDATES {
            let path = local_dir.join(filename);
            if path.exists() {
                return Ok(path);
            }
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let global_config = config_dir.join(APP_DIR).join("paystrap.yaml");
        if global_config.exists() {
            return Ok(global_config);
        }
    }

    Err(ConfigError::ConfigFileNotFound)
}

/// Load the bootstrap config
///
/// An explicit path must exist. Without one the search order of
/// [`find_config_file`] applies, and built-in defaults are used when nothing
/// is found.
pub fn load_config(explicit: Option<&Path>) -> Result<(BootstrapConfig, Option<PathBuf>)> {
    let path = match explicit {
        Some(path) if path.exists() => path.to_path_buf(),
        Some(path) => return Err(ConfigError::ConfigFileMissing(path.to_path_buf())),
        None => match find_config_file() {
            Ok(path) => path,
            Err(ConfigError::ConfigFileNotFound) => {
                tracing::debug!("No config file found, using defaults");
                return Ok((BootstrapConfig::default(), None));
            }
            Err(e) => return Err(e),
        },
    };

    let config = BootstrapConfig::from_file(&path)?;
    tracing::debug!(path = %path.display(), "Loaded config");
    Ok((config, Some(path)))
}
