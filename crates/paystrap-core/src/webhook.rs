//! Webhook relay provisioning
//!
//! Starts the relay detached and reads just enough of its output to capture
//! the signing secret. The scan is bounded by a timeout and a line cap; the
//! relay is left running either way.

use crate::error::{BootstrapError, Result, ScanBound};
use crate::extract::{Field, extract};
use crate::process::{Invocation, ProcessGateway};
use futures_util::StreamExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Where the provisioner is in bringing up the relay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionerState {
    /// `provision` has not been called
    NotStarted,
    /// Relay process being spawned
    Starting,
    /// Relay running, output being scanned
    AwaitingSecret,
    /// Secret read; the relay keeps running
    SecretCaptured,
    /// Spawn failed, or the relay exited before printing a secret
    StartFailed,
    /// Timeout or line cap hit first; the relay keeps running
    SecretNotFound,
}

/// Limits on how much relay output is read while looking for the secret
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanBounds {
    pub timeout: Duration,
    pub max_lines: usize,
}

impl Default for ScanBounds {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_lines: 200,
        }
    }
}

/// A running relay and the secret it announced
#[derive(Clone, PartialEq, Eq)]
pub struct RelayHandle {
    pub pid: Option<u32>,
    pub log_path: Option<PathBuf>,
    pub secret: String,
}

impl std::fmt::Debug for RelayHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayHandle")
            .field("pid", &self.pid)
            .field("log_path", &self.log_path)
            .field("secret", &paystrap_config::redact(&self.secret))
            .finish()
    }
}

enum ScanOutcome {
    Found(String),
    LineCap,
    Ended,
}

/// Brings up the webhook relay and captures its signing secret
pub struct WebhookProvisioner<'a> {
    gateway: &'a dyn ProcessGateway,
    bounds: ScanBounds,
    state: ProvisionerState,
}

impl<'a> WebhookProvisioner<'a> {
    pub fn new(gateway: &'a dyn ProcessGateway, bounds: ScanBounds) -> Self {
        Self {
            gateway,
            bounds,
            state: ProvisionerState::NotStarted,
        }
    }

    pub fn state(&self) -> ProvisionerState {
        self.state
    }

    fn transition(&mut self, next: ProvisionerState) {
        tracing::debug!(from = ?self.state, to = ?next, "Webhook provisioner state");
        self.state = next;
    }

    /// Start the relay and wait (within bounds) for its signing secret
    pub async fn provision(
        &mut self,
        invocation: &Invocation,
        log_path: &Path,
    ) -> Result<RelayHandle> {
        self.transition(ProvisionerState::Starting);

        let process = match self.gateway.spawn_detached(invocation, log_path).await {
            Ok(process) => process,
            Err(e) => {
                self.transition(ProvisionerState::StartFailed);
                return Err(e);
            }
        };

        tracing::info!(pid = ?process.pid, "Relay started, waiting for signing secret");
        self.transition(ProvisionerState::AwaitingSecret);

        let max_lines = self.bounds.max_lines;
        let mut lines = process.lines;
        let scan = async {
            let mut seen = 0usize;
            while let Some(line) = lines.next().await {
                let line: String = match line {
                    Ok(line) => line,
                    Err(e) => return Err(e),
                };
                seen += 1;
                if let Some(secret) = extract(&line, Field::WebhookSecret) {
                    return Ok(ScanOutcome::Found(secret));
                }
                if seen >= max_lines {
                    return Ok(ScanOutcome::LineCap);
                }
            }
            Ok::<ScanOutcome, std::io::Error>(ScanOutcome::Ended)
        };

        let outcome = tokio::time::timeout(self.bounds.timeout, scan).await;

        let bound = match outcome {
            Ok(Ok(ScanOutcome::Found(secret))) => {
                self.transition(ProvisionerState::SecretCaptured);
                return Ok(RelayHandle {
                    pid: process.pid,
                    log_path: process.log_path,
                    secret,
                });
            }
            Ok(Ok(ScanOutcome::LineCap)) => ScanBound::LineCap(max_lines),
            Err(_elapsed) => ScanBound::Timeout(self.bounds.timeout),
            Ok(Ok(ScanOutcome::Ended)) => {
                self.transition(ProvisionerState::StartFailed);
                return Err(BootstrapError::StartFailed(
                    "relay exited before announcing a signing secret".to_string(),
                ));
            }
            Ok(Err(e)) => {
                self.transition(ProvisionerState::StartFailed);
                return Err(BootstrapError::StartFailed(format!(
                    "relay output unreadable: {}",
                    e
                )));
            }
        };

        // The relay itself keeps running; only the scan gives up.
        tracing::warn!(%bound, "Stopped waiting for the webhook signing secret");
        self.transition(ProvisionerState::SecretNotFound);
        Err(BootstrapError::SecretNotFound(bound))
    }
}
