use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config directory could not be determined for this platform")]
    ConfigDirNotFound,

    #[error(
        "No paystrap.yaml found. Searched:\n\
        - PAYSTRAP_CONFIG_PATH\n\
        - current directory: paystrap.local.yaml, paystrap.yaml\n\
        - ./.paystrap/paystrap.yaml\n\
        - ~/.config/paystrap/paystrap.yaml"
    )]
    ConfigFileNotFound,

    #[error("Config file does not exist: {0}")]
    ConfigFileMissing(PathBuf),

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Settings store is corrupt: {path}\nReason: {message}")]
    CorruptSettings { path: PathBuf, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
