//! Configuration persister
//!
//! Writes the bundle to the environment file in two phases and forwards it to
//! the settings store.
//!
//! Phase one replaces the whole file with the base keys. Phase two appends
//! the webhook secret once the relay has produced it. The phases are separate
//! writes: a run that stops in between leaves a complete file without the
//! secret, and the next run regenerates everything.

use crate::bundle::CredentialBundle;
use crate::error::{BootstrapError, Result};
use crate::extract::Field;
use paystrap_config::SettingsStore;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

pub const ACCOUNT_ID_KEY: &str = "STRIPE_ACCOUNT_ID";
pub const PUBLISHABLE_KEY_KEY: &str = "STRIPE_PUBLISHABLE_KEY";
pub const SECRET_KEY_KEY: &str = "STRIPE_SECRET_KEY";
pub const API_VERSION_KEY: &str = "STRIPE_API_VERSION";
pub const WEBHOOK_SECRET_KEY: &str = "STRIPE_WEBHOOK_SECRET";

/// Base keys in file order
const BASE_FIELDS: [(Field, &str); 3] = [
    (Field::AccountId, ACCOUNT_ID_KEY),
    (Field::PublishableKey, PUBLISHABLE_KEY_KEY),
    (Field::SecretKey, SECRET_KEY_KEY),
];

/// Render the phase-one content: every set base field plus the API version
pub fn render_base(bundle: &CredentialBundle) -> String {
    let mut content = String::new();
    for (field, key) in BASE_FIELDS {
        if let Some(value) = bundle.get(field) {
            content.push_str(&format!("{}={}\n", key, value));
        }
    }
    content.push_str(&format!("{}={}\n", API_VERSION_KEY, bundle.api_version()));
    content
}

/// Flat `KEY=VALUE` environment file
#[derive(Debug, Clone)]
pub struct EnvFileWriter {
    path: PathBuf,
}

impl EnvFileWriter {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Phase one: replace the file with the base keys
    pub async fn write_base(&self, bundle: &CredentialBundle) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.error(e))?;
        }

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(&self.path).await.map_err(|e| self.error(e))?;
        file.write_all(render_base(bundle).as_bytes())
            .await
            .map_err(|e| self.error(e))?;
        file.flush().await.map_err(|e| self.error(e))?;

        tracing::info!(path = %self.path.display(), "Wrote base environment file");
        Ok(())
    }

    /// Phase two: append the webhook secret line to the existing file
    pub async fn append_webhook_secret(&self, secret: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| self.error(e))?;

        file.write_all(format!("{}={}\n", WEBHOOK_SECRET_KEY, secret).as_bytes())
            .await
            .map_err(|e| self.error(e))?;
        file.flush().await.map_err(|e| self.error(e))?;

        tracing::info!(path = %self.path.display(), "Appended webhook secret");
        Ok(())
    }

    fn error(&self, source: std::io::Error) -> BootstrapError {
        BootstrapError::EnvFile {
            path: self.path.clone(),
            source,
        }
    }
}

/// Hand the full field set to the application's settings store
pub async fn forward_to_config_store(
    store: &dyn SettingsStore,
    bundle: &CredentialBundle,
) -> Result<()> {
    store
        .update_payment_settings(&bundle.to_payment_settings())
        .await
        .map_err(BootstrapError::ConfigForwardFailure)
}
