//! Payment settings store
//!
//! The application keeps its payment configuration in a JSON document. The
//! bootstrap pipeline only ever touches the `payment` section; every other
//! section is carried over untouched.

use crate::error::{ConfigError, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

const PAYMENT_SECTION: &str = "payment";
const BACKUP_SUFFIX: &str = "backup";

/// The five fields the store accepts
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSettings {
    pub account_id: Option<String>,
    pub publishable_key: Option<String>,
    pub secret_key: Option<String>,
    pub webhook_secret: Option<String>,
    pub api_version: String,
}

impl std::fmt::Debug for PaymentSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentSettings")
            .field("account_id", &self.account_id)
            .field("publishable_key", &self.publishable_key)
            .field("secret_key", &self.secret_key.as_deref().map(redact))
            .field("webhook_secret", &self.webhook_secret.as_deref().map(redact))
            .field("api_version", &self.api_version)
            .finish()
    }
}

/// Mask a secret, keeping its prefix so the kind of credential stays visible
pub fn redact(value: &str) -> String {
    let prefix_len = value
        .char_indices()
        .filter(|(_, c)| *c == '_')
        .map(|(i, _)| i + 1)
        .last()
        .unwrap_or(0)
        .min(8);
    format!("{}****", value.get(..prefix_len).unwrap_or_default())
}

/// Application-level configuration store
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Replace the stored payment settings
    async fn update_payment_settings(&self, settings: &PaymentSettings) -> Result<()>;
}

/// JSON file backed settings store
pub struct FileSettingsStore {
    path: PathBuf,
}

impl FileSettingsStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn backup_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".");
        name.push(BACKUP_SUFFIX);
        PathBuf::from(name)
    }

    /// Load the whole document, or an empty object when none exists yet
    pub async fn load_document(&self) -> Result<serde_json::Map<String, serde_json::Value>> {
        if !self.path.exists() {
            tracing::debug!("Settings file not found, starting empty");
            return Ok(serde_json::Map::new());
        }

        let content = fs::read_to_string(&self.path).await?;
        if content.trim().is_empty() {
            return Ok(serde_json::Map::new());
        }

        match serde_json::from_str::<serde_json::Value>(&content)? {
            serde_json::Value::Object(map) => Ok(map),
            other => Err(ConfigError::CorruptSettings {
                path: self.path.clone(),
                message: format!("expected a JSON object, found {}", json_kind(&other)),
            }),
        }
    }

    pub async fn load_payment_settings(&self) -> Result<Option<PaymentSettings>> {
        let mut document = self.load_document().await?;
        match document.remove(PAYMENT_SECTION) {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    async fn save_document(&self, document: serde_json::Map<String, serde_json::Value>) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).await?;
        }

        let backup = self.backup_path();
        if self.path.exists() {
            if backup.exists() {
                fs::remove_file(&backup).await?;
            }
            fs::rename(&self.path, &backup).await?;
            tracing::debug!("Created settings backup");
        }

        let content = serde_json::to_string_pretty(&serde_json::Value::Object(document))?;

        // Created private from the start; the old file was moved to the backup.
        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(&self.path).await?;
        file.write_all(content.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for FileSettingsStore {
    async fn update_payment_settings(&self, settings: &PaymentSettings) -> Result<()> {
        let mut document = self.load_document().await?;
        document.insert(PAYMENT_SECTION.to_string(), serde_json::to_value(settings)?);
        document.insert(
            "updated_at".to_string(),
            serde_json::Value::String(Utc::now().to_rfc3339()),
        );

        self.save_document(document).await?;
        tracing::info!(path = %self.path.display(), "Payment settings updated");
        Ok(())
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
