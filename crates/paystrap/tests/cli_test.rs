#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;

fn paystrap(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("paystrap").unwrap();
    cmd.current_dir(dir)
        .env_remove("PAYSTRAP_CONFIG_PATH")
        .env_remove("RUST_LOG");
    cmd
}

fn write_config(dir: &Path, body: &str) -> std::path::PathBuf {
    let path = dir.join("paystrap.yaml");
    std::fs::write(&path, body).unwrap();
    path
}

#[test]
fn test_cli_help() {
    let dir = tempfile::tempdir().unwrap();
    paystrap(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("webhook relay"))
        .stdout(predicate::str::contains("--config"))
        .stdout(predicate::str::contains("--verbose"));
}

#[test]
fn test_cli_version() {
    let dir = tempfile::tempdir().unwrap();
    paystrap(dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("paystrap"));
}

#[test]
fn test_unknown_flag_is_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    paystrap(dir.path()).arg("--bogus").assert().code(2);
}

#[test]
fn test_missing_config_path() {
    let dir = tempfile::tempdir().unwrap();
    paystrap(dir.path())
        .arg("--config")
        .arg(dir.path().join("nope.yaml"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_invalid_config_is_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    write_config(dir.path(), "webhook:\n  max_lines: 0\n");

    paystrap(dir.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Invalid configuration"));
}

#[test]
fn test_unknown_config_key_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    write_config(dir.path(), "cli: stripe\nlisten_port: 4242\n");

    paystrap(dir.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Failed to parse"));
}

#[test]
fn test_missing_platform_cli_fails_first_stage() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(
        dir.path(),
        &format!(
            "cli: paystrap-test-no-such-cli\n\
             install_hint: see https://docs.stripe.com/stripe-cli\n\
             settings_file: {}\n",
            dir.path().join("settings.json").display()
        ),
    );

    paystrap(dir.path())
        .arg("--config")
        .arg(&config)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("CheckingEnvironment"))
        .stderr(predicate::str::contains("see https://docs.stripe.com/stripe-cli"));

    assert!(!dir.path().join(".env").exists());
}

#[test]
fn test_config_from_env_var() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("custom.yaml");
    std::fs::write(
        &config,
        format!(
            "cli: paystrap-test-other-cli\nsettings_file: {}\n",
            dir.path().join("settings.json").display()
        ),
    )
    .unwrap();

    paystrap(dir.path())
        .env("PAYSTRAP_CONFIG_PATH", &config)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("paystrap-test-other-cli"));
}
