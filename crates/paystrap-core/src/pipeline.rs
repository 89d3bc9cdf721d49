//! Bootstrap pipeline orchestrator
//!
//! Runs the stages strictly in order and stops at the first failure. Field
//! extraction misses are not failures on their own; they surface in the final
//! `Verifying` stage.

use crate::bundle::CredentialBundle;
use crate::error::{BootstrapError, Result, StageFailure};
use crate::extract::{AccountStatus, Field, extract};
use crate::persist::{EnvFileWriter, forward_to_config_store};
use crate::platform::PlatformCli;
use crate::process::ProcessGateway;
use crate::webhook::{ScanBounds, WebhookProvisioner};
use paystrap_config::{BootstrapConfig, PayoutInterval, SettingsStore};
use std::path::PathBuf;

/// Pipeline stages in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Platform CLI on PATH
    CheckingEnvironment,
    /// Interactive `login`
    Authenticating,
    /// Account lookup, yields the account id
    FetchingAccount,
    /// Key listing, yields the publishable and secret keys
    FetchingKeys,
    /// Env file rewritten with the base keys
    WritingBaseConfig,
    /// Relay started and its signing secret captured
    ProvisioningWebhook,
    /// Signing secret appended to the env file
    PersistingWebhookSecret,
    /// Settings store updated
    ForwardingConfig,
    /// Capability requests and payout schedule
    EnablingCapabilities,
    /// Every required field present
    Verifying,
}

impl Stage {
    pub const ALL: [Stage; 10] = [
        Stage::CheckingEnvironment,
        Stage::Authenticating,
        Stage::FetchingAccount,
        Stage::FetchingKeys,
        Stage::WritingBaseConfig,
        Stage::ProvisioningWebhook,
        Stage::PersistingWebhookSecret,
        Stage::ForwardingConfig,
        Stage::EnablingCapabilities,
        Stage::Verifying,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::CheckingEnvironment => "CheckingEnvironment",
            Self::Authenticating => "Authenticating",
            Self::FetchingAccount => "FetchingAccount",
            Self::FetchingKeys => "FetchingKeys",
            Self::WritingBaseConfig => "WritingBaseConfig",
            Self::ProvisioningWebhook => "ProvisioningWebhook",
            Self::PersistingWebhookSecret => "PersistingWebhookSecret",
            Self::ForwardingConfig => "ForwardingConfig",
            Self::EnablingCapabilities => "EnablingCapabilities",
            Self::Verifying => "Verifying",
        }
    }

    /// Human readable label for progress output
    pub fn label(&self) -> &'static str {
        match self {
            Self::CheckingEnvironment => "Checking platform CLI",
            Self::Authenticating => "Logging in",
            Self::FetchingAccount => "Fetching account",
            Self::FetchingKeys => "Fetching API keys",
            Self::WritingBaseConfig => "Writing environment file",
            Self::ProvisioningWebhook => "Starting webhook relay",
            Self::PersistingWebhookSecret => "Saving webhook secret",
            Self::ForwardingConfig => "Updating payment settings",
            Self::EnablingCapabilities => "Requesting capabilities",
            Self::Verifying => "Verifying credentials",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Progress callbacks; every method defaults to doing nothing
pub trait StageObserver {
    fn stage_started(&mut self, _stage: Stage) {}
    fn stage_succeeded(&mut self, _stage: Stage, _detail: Option<&str>) {}
    fn stage_skipped(&mut self, _stage: Stage, _reason: &str) {}
    fn stage_failed(&mut self, _stage: Stage, _error: &BootstrapError) {}
}

#[derive(Debug, Default)]
pub struct NoopObserver;

impl StageObserver for NoopObserver {}

/// What a run got done, whether or not it succeeded
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub cli_path: Option<PathBuf>,
    pub account_id: Option<String>,
    /// Onboarding flags from the account lookup
    pub account_status: AccountStatus,
    /// Set once the base environment file has been written
    pub env_file: Option<PathBuf>,
    pub relay_pid: Option<u32>,
    pub relay_log: Option<PathBuf>,
    pub capabilities: Vec<String>,
    pub payout_schedule: Option<PayoutInterval>,
}

/// Final state of a run
#[derive(Debug)]
pub enum RunStatus {
    /// Every stage completed
    Succeeded,
    /// Stopped at the stage carried in the failure
    Failed(StageFailure),
}

/// Status plus everything the run got done
#[derive(Debug)]
pub struct PipelineOutcome {
    pub status: RunStatus,
    pub report: RunReport,
}

impl PipelineOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.status, RunStatus::Succeeded)
    }

    pub fn failure(&self) -> Option<&StageFailure> {
        match &self.status {
            RunStatus::Succeeded => None,
            RunStatus::Failed(failure) => Some(failure),
        }
    }

    /// Process exit code for this outcome
    pub fn exit_code(&self) -> i32 {
        if self.is_success() { 0 } else { 1 }
    }
}

pub struct Pipeline<'a> {
    gateway: &'a dyn ProcessGateway,
    store: &'a dyn SettingsStore,
    config: BootstrapConfig,
    platform: PlatformCli,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        gateway: &'a dyn ProcessGateway,
        store: &'a dyn SettingsStore,
        config: BootstrapConfig,
    ) -> Self {
        let platform = PlatformCli::new(&config.cli);
        Self {
            gateway,
            store,
            config,
            platform,
        }
    }

    pub fn config(&self) -> &BootstrapConfig {
        &self.config
    }

    /// Run every stage once. A fresh bundle is built on each call.
    pub async fn run(&self, observer: &mut dyn StageObserver) -> PipelineOutcome {
        let mut bundle = CredentialBundle::new(&self.config.api_version);
        let mut report = RunReport::default();

        let status = match self.execute(&mut bundle, &mut report, observer).await {
            Ok(()) => {
                tracing::info!("Bootstrap succeeded");
                RunStatus::Succeeded
            }
            Err(failure) => RunStatus::Failed(failure),
        };

        PipelineOutcome { status, report }
    }

    async fn execute(
        &self,
        bundle: &mut CredentialBundle,
        report: &mut RunReport,
        observer: &mut dyn StageObserver,
    ) -> std::result::Result<(), StageFailure> {
        observer.stage_started(Stage::CheckingEnvironment);
        let result = self.check_environment();
        let cli_path = conclude(observer, Stage::CheckingEnvironment, result, |path| {
            Some(format!("found {}", path.display()))
        })?;
        report.cli_path = Some(cli_path);

        observer.stage_started(Stage::Authenticating);
        let result = self.authenticate().await;
        conclude(observer, Stage::Authenticating, result, |_| None)?;

        observer.stage_started(Stage::FetchingAccount);
        let result = self.fetch_account(bundle).await;
        let (account_id, account_status) =
            conclude(observer, Stage::FetchingAccount, result, |(id, _)| {
                Some(match id {
                    Some(id) => format!("account {}", id),
                    None => "no account id in output".to_string(),
                })
            })?;
        report.account_id = account_id;
        report.account_status = account_status;

        observer.stage_started(Stage::FetchingKeys);
        let result = self.fetch_keys(bundle).await;
        conclude(observer, Stage::FetchingKeys, result, |found| {
            Some(format!("{} of 2 keys found", found))
        })?;

        observer.stage_started(Stage::WritingBaseConfig);
        let writer = EnvFileWriter::new(&self.config.env_file);
        let result = writer.write_base(bundle).await;
        conclude(observer, Stage::WritingBaseConfig, result, |_| {
            Some(format!("wrote {}", writer.path().display()))
        })?;
        report.env_file = Some(writer.path().to_path_buf());

        observer.stage_started(Stage::ProvisioningWebhook);
        let bounds = ScanBounds {
            timeout: self.config.webhook.timeout(),
            max_lines: self.config.webhook.max_lines,
        };
        let mut provisioner = WebhookProvisioner::new(self.gateway, bounds);
        let result = provisioner
            .provision(
                &self.platform.listen(&self.config.forward_to),
                &self.config.webhook.log_file,
            )
            .await;
        let relay = conclude(observer, Stage::ProvisioningWebhook, result, |relay| {
            Some(match relay.pid {
                Some(pid) => format!("relay running (pid {})", pid),
                None => "relay running".to_string(),
            })
        })?;
        report.relay_pid = relay.pid;
        report.relay_log = relay.log_path.clone();
        bundle.fill(Field::WebhookSecret, Some(relay.secret.clone()));

        observer.stage_started(Stage::PersistingWebhookSecret);
        let result = writer.append_webhook_secret(&relay.secret).await;
        conclude(observer, Stage::PersistingWebhookSecret, result, |_| None)?;

        observer.stage_started(Stage::ForwardingConfig);
        let result = forward_to_config_store(self.store, bundle).await;
        conclude(observer, Stage::ForwardingConfig, result, |_| None)?;

        observer.stage_started(Stage::EnablingCapabilities);
        match bundle.get(Field::AccountId) {
            Some(account_id) => {
                let result = self.enable_capabilities(account_id).await;
                conclude(observer, Stage::EnablingCapabilities, result, |_| {
                    Some(self.config.capabilities.join(", "))
                })?;
                report.capabilities = self.config.capabilities.clone();
                report.payout_schedule = self.config.payout_schedule;
            }
            None => {
                tracing::warn!("No account id, skipping capability requests");
                observer.stage_skipped(Stage::EnablingCapabilities, "no account id");
            }
        }

        observer.stage_started(Stage::Verifying);
        let result = verify(bundle);
        conclude(observer, Stage::Verifying, result, |_| None)?;

        Ok(())
    }

    fn check_environment(&self) -> Result<PathBuf> {
        self.gateway
            .locate(self.platform.program())
            .ok_or_else(|| BootstrapError::EnvironmentMissing {
                program: self.platform.program().to_string(),
            })
    }

    async fn authenticate(&self) -> Result<()> {
        self.gateway
            .run(&self.platform.login())
            .await?
            .into_success()?;
        Ok(())
    }

    async fn fetch_account(
        &self,
        bundle: &mut CredentialBundle,
    ) -> Result<(Option<String>, AccountStatus)> {
        let output = self
            .gateway
            .run(&self.platform.account())
            .await?
            .into_success()?;

        let account_id = extract(&output.stdout, Field::AccountId);
        bundle.fill(Field::AccountId, account_id.clone());

        let status = AccountStatus::parse(&output.stdout);
        tracing::debug!(?status, "Account status");
        Ok((account_id, status))
    }

    /// Returns how many of the two keys were found
    async fn fetch_keys(&self, bundle: &mut CredentialBundle) -> Result<usize> {
        let output = self
            .gateway
            .run(&self.platform.list_keys())
            .await?
            .into_success()?;

        let mut found = 0;
        for field in [Field::PublishableKey, Field::SecretKey] {
            if bundle.fill(field, extract(&output.stdout, field)) {
                found += 1;
            }
        }
        Ok(found)
    }

    async fn enable_capabilities(&self, account_id: &str) -> Result<()> {
        for capability in &self.config.capabilities {
            tracing::info!(%capability, "Requesting capability");
            self.gateway
                .run(&self.platform.enable_capability(account_id, capability))
                .await?
                .into_success()?;
        }

        if let Some(interval) = self.config.payout_schedule {
            tracing::info!(%interval, "Setting payout schedule");
            self.gateway
                .run(&self.platform.payout_schedule(interval))
                .await?
                .into_success()?;
        }

        Ok(())
    }
}

/// Every required field must be present once all stages have run
pub fn verify(bundle: &CredentialBundle) -> Result<()> {
    match bundle.missing_fields().first() {
        Some(field) => Err(BootstrapError::MissingField(*field)),
        None => Ok(()),
    }
}

fn conclude<T>(
    observer: &mut dyn StageObserver,
    stage: Stage,
    result: Result<T>,
    detail: impl FnOnce(&T) -> Option<String>,
) -> std::result::Result<T, StageFailure> {
    match result {
        Ok(value) => {
            let detail = detail(&value);
            tracing::debug!(stage = stage.name(), "Stage completed");
            observer.stage_succeeded(stage, detail.as_deref());
            Ok(value)
        }
        Err(error) => {
            tracing::error!(stage = stage.name(), %error, "Stage failed");
            observer.stage_failed(stage, &error);
            Err(StageFailure { stage, error })
        }
    }
}
