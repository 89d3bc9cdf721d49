#![cfg(unix)]

use paystrap_core::{
    BootstrapError, Invocation, ProcessGateway, ProvisionerState, ScanBound, ScanBounds,
    SystemGateway, WebhookProvisioner,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

fn script(dir: &TempDir, name: &str, body: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, body).unwrap();
    path
}

fn sh(path: &Path) -> Invocation {
    Invocation::new("sh", [path.to_string_lossy().to_string()])
}

fn is_running(pid: u32) -> bool {
    std::process::Command::new("kill")
        .args(["-0", &pid.to_string()])
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

fn stop(pid: u32) {
    let _ = std::process::Command::new("kill").arg(pid.to_string()).status();
}

fn gateway() -> SystemGateway {
    SystemGateway::new().with_poll_interval(Duration::from_millis(20))
}

#[test]
fn test_locate_shell() {
    assert!(gateway().locate("sh").is_some());
    assert!(gateway().locate("paystrap-no-such-binary").is_none());
}

#[tokio::test]
async fn test_run_captures_output_and_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let path = script(&dir, "fail.sh", "echo hello\necho oops >&2\nexit 3\n");

    let output = gateway().run(&sh(&path)).await.unwrap();

    assert_eq!(output.stdout, "hello\n");
    assert_eq!(output.stderr, "oops\n");
    assert_eq!(output.exit_code, Some(3));
    assert!(!output.success());

    match output.into_success() {
        Err(BootstrapError::ProcessFailure {
            exit_code, stderr, ..
        }) => {
            assert_eq!(exit_code, Some(3));
            assert_eq!(stderr, "oops");
        }
        other => panic!("expected ProcessFailure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_run_missing_program() {
    let invocation = Invocation::new("paystrap-no-such-binary", ["--version"]);
    let result = gateway().run(&invocation).await;
    assert!(matches!(
        result,
        Err(BootstrapError::EnvironmentMissing { .. })
    ));
}

#[tokio::test]
async fn test_detached_relay_secret_is_captured() {
    let dir = tempfile::tempdir().unwrap();
    let path = script(
        &dir,
        "listen.sh",
        "echo 'Getting ready...'\n\
         sleep 0.2\n\
         echo '> Ready! Your webhook signing secret is whsec_live123 (^C to quit)'\n\
         exec sleep 30\n",
    );
    let log = dir.path().join("logs/relay.log");

    let gateway = gateway();
    let bounds = ScanBounds {
        timeout: Duration::from_secs(10),
        max_lines: 200,
    };
    let mut provisioner = WebhookProvisioner::new(&gateway, bounds);
    let handle = provisioner.provision(&sh(&path), &log).await.unwrap();
    let pid = handle.pid.expect("relay pid");

    assert!(is_running(pid), "relay should keep running after the scan");
    stop(pid);

    assert_eq!(handle.secret, "whsec_live123");
    assert_eq!(handle.log_path.as_deref(), Some(log.as_path()));
    assert_eq!(provisioner.state(), ProvisionerState::SecretCaptured);
    assert!(std::fs::read_to_string(&log).unwrap().contains("Getting ready"));
}

#[tokio::test]
async fn test_silent_relay_times_out() {
    let dir = tempfile::tempdir().unwrap();
    let pid_file = dir.path().join("relay.pid");
    let path = script(
        &dir,
        "silent.sh",
        &format!("echo $$ > {}\nexec sleep 30\n", pid_file.display()),
    );
    let log = dir.path().join("relay.log");

    let gateway = gateway();
    let bounds = ScanBounds {
        timeout: Duration::from_millis(300),
        max_lines: 200,
    };
    let mut provisioner = WebhookProvisioner::new(&gateway, bounds);
    let result = provisioner.provision(&sh(&path), &log).await;

    assert!(matches!(
        result,
        Err(BootstrapError::SecretNotFound(ScanBound::Timeout(_)))
    ));
    assert_eq!(provisioner.state(), ProvisionerState::SecretNotFound);

    let pid: u32 = std::fs::read_to_string(&pid_file)
        .unwrap()
        .trim()
        .parse()
        .unwrap();
    assert!(is_running(pid), "relay should outlive the scan");
    stop(pid);
}

#[tokio::test]
async fn test_invalid_utf8_does_not_end_scan() {
    let dir = tempfile::tempdir().unwrap();
    let path = script(
        &dir,
        "garbled.sh",
        "printf 'Getting ready \\377\\n'\n\
         sleep 0.2\n\
         echo '> Ready! Your webhook signing secret is whsec_abc (^C to quit)'\n\
         exec sleep 30\n",
    );
    let log = dir.path().join("relay.log");

    let gateway = gateway();
    let bounds = ScanBounds {
        timeout: Duration::from_secs(10),
        max_lines: 200,
    };
    let mut provisioner = WebhookProvisioner::new(&gateway, bounds);
    let result = provisioner.provision(&sh(&path), &log).await;

    let handle = match result {
        Ok(handle) => handle,
        Err(e) => panic!("expected the secret, got {:?}", e),
    };
    if let Some(pid) = handle.pid {
        stop(pid);
    }
    assert_eq!(handle.secret, "whsec_abc");
    assert_eq!(provisioner.state(), ProvisionerState::SecretCaptured);
}

#[tokio::test]
async fn test_relay_exit_without_secret() {
    let dir = tempfile::tempdir().unwrap();
    let path = script(&dir, "broken.sh", "echo 'error: not logged in' >&2\nexit 1\n");
    let log = dir.path().join("relay.log");

    let gateway = gateway();
    let mut provisioner = WebhookProvisioner::new(&gateway, ScanBounds::default());
    let result = provisioner.provision(&sh(&path), &log).await;

    assert!(matches!(result, Err(BootstrapError::StartFailed(_))));
    assert_eq!(provisioner.state(), ProvisionerState::StartFailed);
    assert!(std::fs::read_to_string(&log).unwrap().contains("not logged in"));
}
