//! Bootstrap error types

use crate::extract::Field;
use crate::pipeline::Stage;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error("{program} not found on PATH")]
    EnvironmentMissing { program: String },

    #[error("`{command}` failed ({status}): {stderr}", status = describe_exit(.exit_code))]
    ProcessFailure {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("Relay failed to start: {0}")]
    StartFailed(String),

    #[error("Webhook secret not found: {0}")]
    SecretNotFound(ScanBound),

    #[error("Missing required field: {0}")]
    MissingField(Field),

    #[error("Settings store rejected the update: {0}")]
    ConfigForwardFailure(#[source] paystrap_config::ConfigError),

    #[error("Failed to write {path}: {source}")]
    EnvFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    }
}

/// Which bound stopped the relay scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanBound {
    Timeout(Duration),
    LineCap(usize),
}

impl std::fmt::Display for ScanBound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanBound::Timeout(d) => write!(f, "no secret within {}s", d.as_secs_f32()),
            ScanBound::LineCap(n) => write!(f, "no secret within the first {} lines", n),
        }
    }
}

/// A stage failure: where the run stopped and why
#[derive(Error, Debug)]
#[error("{stage} failed: {error}")]
pub struct StageFailure {
    pub stage: Stage,
    #[source]
    pub error: BootstrapError,
}

pub type Result<T> = std::result::Result<T, BootstrapError>;
