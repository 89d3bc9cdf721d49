use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream;
use paystrap_config::{BootstrapConfig, ConfigError, PaymentSettings, SettingsStore, WebhookConfig};
use paystrap_core::{
    BootstrapError, DetachedProcess, Invocation, ProcessGateway, ProcessOutput, Stage,
    StageObserver,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;

pub const ACCOUNT_JSON: &str = r#"{
  "id": "acct_123",
  "object": "account",
  "charges_enabled": false,
  "country": "US",
  "details_submitted": true,
  "payouts_enabled": false
}"#;

pub const CONFIG_LIST: &str = r#"[default]
  device_name = 'builder'
  test_mode_api_key = 'sk_test_xyz'
  test_mode_pub_key = 'pk_test_abc'
"#;

#[allow(dead_code)]
pub enum Relay {
    /// Prints these lines, then keeps running
    Lines(Vec<String>),
    /// Prints nothing and keeps running
    Silent,
}

/// Stands in for the stripe CLI
pub struct FakeGateway {
    installed: bool,
    responses: HashMap<String, (String, i32)>,
    relay: Relay,
    calls: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl FakeGateway {
    /// A CLI that answers every call the happy path makes
    pub fn stripe() -> Self {
        Self {
            installed: true,
            responses: HashMap::new(),
            relay: Relay::Lines(vec![
                "Getting ready...".to_string(),
                "> Ready! Your webhook signing secret is whsec_999 (^C to quit)".to_string(),
            ]),
            calls: Mutex::new(Vec::new()),
        }
        .respond("get /v1/account", ACCOUNT_JSON, 0)
        .respond("config --list", CONFIG_LIST, 0)
    }

    pub fn respond(mut self, args: &str, stdout: &str, exit_code: i32) -> Self {
        self.responses
            .insert(args.to_string(), (stdout.to_string(), exit_code));
        self
    }

    pub fn relay(mut self, relay: Relay) -> Self {
        self.relay = relay;
        self
    }

    pub fn relay_secret(self, secret: &str) -> Self {
        self.relay(Relay::Lines(vec![format!(
            "> Ready! Your webhook signing secret is {} (^C to quit)",
            secret
        )]))
    }

    pub fn not_installed(mut self) -> Self {
        self.installed = false;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProcessGateway for FakeGateway {
    fn locate(&self, program: &str) -> Option<PathBuf> {
        self.installed
            .then(|| PathBuf::from(format!("/usr/local/bin/{}", program)))
    }

    async fn run(&self, invocation: &Invocation) -> paystrap_core::Result<ProcessOutput> {
        self.calls.lock().unwrap().push(invocation.command_line());

        let (stdout, exit_code) = self
            .responses
            .get(&invocation.args.join(" "))
            .cloned()
            .unwrap_or_default();
        let stderr = if exit_code == 0 {
            String::new()
        } else {
            "error: request failed".to_string()
        };

        Ok(ProcessOutput {
            command: invocation.command(),
            stdout,
            stderr,
            exit_code: Some(exit_code),
        })
    }

    async fn spawn_detached(
        &self,
        invocation: &Invocation,
        log_path: &Path,
    ) -> paystrap_core::Result<DetachedProcess> {
        self.calls.lock().unwrap().push(invocation.command_line());
        if !self.installed {
            return Err(BootstrapError::EnvironmentMissing {
                program: invocation.program.clone(),
            });
        }

        let lines = match &self.relay {
            Relay::Lines(lines) => {
                let lines: Vec<std::io::Result<String>> =
                    lines.iter().cloned().map(Ok).collect();
                stream::iter(lines).chain(stream::pending()).boxed()
            }
            Relay::Silent => stream::pending::<std::io::Result<String>>().boxed(),
        };

        Ok(DetachedProcess {
            pid: Some(31337),
            log_path: Some(log_path.to_path_buf()),
            lines,
        })
    }
}

/// Records every settings update it receives
#[derive(Default)]
pub struct RecordingStore {
    pub fail: bool,
    updates: Mutex<Vec<PaymentSettings>>,
}

#[allow(dead_code)]
impl RecordingStore {
    pub fn failing() -> Self {
        Self {
            fail: true,
            updates: Mutex::new(Vec::new()),
        }
    }

    pub fn updates(&self) -> Vec<PaymentSettings> {
        self.updates.lock().unwrap().clone()
    }
}

#[async_trait]
impl SettingsStore for RecordingStore {
    async fn update_payment_settings(
        &self,
        settings: &PaymentSettings,
    ) -> paystrap_config::Result<()> {
        if self.fail {
            return Err(ConfigError::InvalidConfig("settings store offline".into()));
        }
        self.updates.lock().unwrap().push(settings.clone());
        Ok(())
    }
}

/// Collects stage events in order
#[derive(Default)]
pub struct RecordingObserver {
    pub started: Vec<Stage>,
    pub succeeded: Vec<Stage>,
    pub skipped: Vec<Stage>,
    pub failed: Vec<Stage>,
}

impl StageObserver for RecordingObserver {
    fn stage_started(&mut self, stage: Stage) {
        self.started.push(stage);
    }

    fn stage_succeeded(&mut self, stage: Stage, _detail: Option<&str>) {
        self.succeeded.push(stage);
    }

    fn stage_skipped(&mut self, stage: Stage, _reason: &str) {
        self.skipped.push(stage);
    }

    fn stage_failed(&mut self, stage: Stage, _error: &BootstrapError) {
        self.failed.push(stage);
    }
}

/// A config whose files all live in a temp dir
pub struct TestWorkspace {
    pub root: TempDir,
}

#[allow(dead_code)]
impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            root: tempfile::tempdir().unwrap(),
        }
    }

    pub fn env_path(&self) -> PathBuf {
        self.root.path().join(".env")
    }

    pub fn config(&self) -> BootstrapConfig {
        BootstrapConfig {
            env_file: self.env_path(),
            webhook: WebhookConfig {
                timeout_secs: 5,
                max_lines: 50,
                log_file: self.root.path().join("relay.log"),
            },
            settings_file: Some(self.root.path().join("settings.json")),
            ..Default::default()
        }
    }

    pub fn env_lines(&self) -> Vec<String> {
        std::fs::read_to_string(self.env_path())
            .unwrap()
            .lines()
            .map(String::from)
            .collect()
    }
}
