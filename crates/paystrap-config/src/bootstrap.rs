//! `paystrap.yaml` model

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CLI: &str = "stripe";
pub const DEFAULT_API_VERSION: &str = "2023-10-16";
pub const DEFAULT_FORWARD_TO: &str = "localhost:8000/webhooks/stripe";
pub const DEFAULT_INSTALL_HINT: &str = "brew install stripe/stripe-cli/stripe";

/// Everything the bootstrap pipeline needs to know up front
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BootstrapConfig {
    /// Platform CLI program name or path
    pub cli: String,
    /// Shown when the CLI cannot be found
    pub install_hint: String,
    /// Pinned API version written alongside the credentials
    pub api_version: String,
    /// Environment file the credentials are written to
    pub env_file: PathBuf,
    /// Local endpoint the webhook relay forwards events to
    pub forward_to: String,
    /// Capabilities requested for the account
    pub capabilities: Vec<String>,
    /// Optional automatic payout schedule
    pub payout_schedule: Option<PayoutInterval>,
    pub webhook: WebhookConfig,
    /// Settings store location (defaults to `~/.config/paystrap/settings.json`)
    pub settings_file: Option<PathBuf>,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            cli: DEFAULT_CLI.to_string(),
            install_hint: DEFAULT_INSTALL_HINT.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            env_file: PathBuf::from(".env"),
            forward_to: DEFAULT_FORWARD_TO.to_string(),
            capabilities: vec!["card_payments".to_string(), "transfers".to_string()],
            payout_schedule: None,
            webhook: WebhookConfig::default(),
            settings_file: None,
        }
    }
}

impl BootstrapConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        // An empty document means "all defaults"
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Self = serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.cli.trim().is_empty() {
            return Err(ConfigError::InvalidConfig("cli must not be empty".into()));
        }
        if self.api_version.trim().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "api_version must not be empty".into(),
            ));
        }
        if self.forward_to.trim().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "forward_to must not be empty".into(),
            ));
        }
        if self.env_file.as_os_str().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "env_file must not be empty".into(),
            ));
        }
        if self.webhook.timeout_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "webhook.timeout_secs must be greater than 0".into(),
            ));
        }
        if self.webhook.max_lines == 0 {
            return Err(ConfigError::InvalidConfig(
                "webhook.max_lines must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Resolved settings store path
    pub fn settings_path(&self) -> Result<PathBuf> {
        match &self.settings_file {
            Some(path) => Ok(path.clone()),
            None => Ok(crate::get_config_dir()?.join("settings.json")),
        }
    }
}

/// Bounds for the relay's secret scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WebhookConfig {
    pub timeout_secs: u64,
    pub max_lines: usize,
    /// Relay stdout/stderr are redirected here
    pub log_file: PathBuf,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_lines: 200,
            log_file: PathBuf::from(".paystrap/relay.log"),
        }
    }
}

impl WebhookConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayoutInterval {
    Daily,
    Weekly,
    Monthly,
}

impl PayoutInterval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

impl std::fmt::Display for PayoutInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
