//! Integration tests for the `gatewatch` binary.
//!
//! Argument parsing, config handling and error exit codes run without a
//! gateway; the gateway-bound commands run against a wiremock server.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a command with env isolation: every `GATEWATCH_*` override is
/// cleared and the config file lives in `config_dir`.
fn gatewatch_cmd(config_dir: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("gatewatch");
    cmd.env("GATEWATCH_CONFIG", config_dir.join("config.toml"))
        .env("NO_COLOR", "1")
        .env_remove("GATEWATCH_PROFILE")
        .env_remove("GATEWATCH_GATEWAY")
        .env_remove("GATEWATCH_MODE")
        .env_remove("GATEWATCH_OUTPUT")
        .env_remove("GATEWATCH_INSECURE")
        .env_remove("GATEWATCH_TIMEOUT")
        .env_remove("RUST_LOG");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

/// Run a command off the async test thread so the mock server keeps serving.
async fn run(mut cmd: assert_cmd::Command) -> std::process::Output {
    tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap()
}

fn now_secs() -> f64 {
    #[allow(clippy::cast_precision_loss, clippy::as_conversions)]
    let secs = chrono::Utc::now().timestamp_millis() as f64 / 1000.0;
    secs
}

async fn mock_gateway() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "name": "Line-1", "ip": "10.0.0.2", "port": 502, "slave_id": 1, "type": "oee", "offset": 0 },
            { "name": "PM-1", "ip": "10.0.0.3", "port": 502, "slave_id": 1, "type": "pm", "offset": 4 },
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/data"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Line-1": { "status": "online", "timestamp": now_secs(), "values": { "good_count": 120.0 } },
            "PM-1": { "status": "offline", "timestamp": now_secs(), "error": "Connection refused" }
        })))
        .mount(&server)
        .await;
    server
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let dir = tempfile::tempdir().unwrap();
    let output = gatewatch_cmd(dir.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    assert!(combined_output(&output).contains("Usage"));
}

#[test]
fn test_help_flag() {
    let dir = tempfile::tempdir().unwrap();
    gatewatch_cmd(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("devices")
                .and(predicate::str::contains("status"))
                .and(predicate::str::contains("watch"))
                .and(predicate::str::contains("pm-defaults")),
        );
}

#[test]
fn test_version_flag() {
    let dir = tempfile::tempdir().unwrap();
    gatewatch_cmd(dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("gatewatch"));
}

#[test]
fn test_devices_subcommands_exist() {
    let dir = tempfile::tempdir().unwrap();
    gatewatch_cmd(dir.path())
        .args(["devices", "--help"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("list")
                .and(predicate::str::contains("get"))
                .and(predicate::str::contains("add"))
                .and(predicate::str::contains("update"))
                .and(predicate::str::contains("remove")),
        );
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_zsh() {
    let dir = tempfile::tempdir().unwrap();
    gatewatch_cmd(dir.path())
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

#[test]
fn test_completions_bash() {
    let dir = tempfile::tempdir().unwrap();
    gatewatch_cmd(dir.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path_honours_override() {
    let dir = tempfile::tempdir().unwrap();
    gatewatch_cmd(dir.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_show_without_file() {
    let dir = tempfile::tempdir().unwrap();
    gatewatch_cmd(dir.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("default_profile"));
}

#[test]
fn test_config_init_non_interactive() {
    let dir = tempfile::tempdir().unwrap();
    gatewatch_cmd(dir.path())
        .args([
            "-y",
            "--profile",
            "line-2",
            "--gateway",
            "http://10.1.2.3:8000/api",
            "--mode",
            "poll",
            "config",
            "init",
        ])
        .assert()
        .success();

    let written = std::fs::read_to_string(dir.path().join("config.toml")).unwrap();
    assert!(written.contains("[profiles.line-2]"));
    assert!(written.contains("http://10.1.2.3:8000/api"));

    gatewatch_cmd(dir.path())
        .args(["--output", "plain", "config", "profiles"])
        .assert()
        .success()
        .stdout(predicate::str::contains("line-2"));
}

#[test]
fn test_config_init_requires_yes_without_terminal() {
    let dir = tempfile::tempdir().unwrap();
    let output = gatewatch_cmd(dir.path())
        .args(["config", "init"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("--yes"));
}

#[test]
fn test_config_init_rejects_bad_url() {
    let dir = tempfile::tempdir().unwrap();
    gatewatch_cmd(dir.path())
        .args(["-y", "--gateway", "ftp://gateway/api", "config", "init"])
        .assert()
        .failure();
    assert!(!dir.path().join("config.toml").exists());
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let dir = tempfile::tempdir().unwrap();
    let output = gatewatch_cmd(dir.path()).arg("foobar").output().unwrap();
    assert!(!output.status.success());
    assert!(combined_output(&output).contains("foobar"));
}

#[test]
fn test_invalid_output_format() {
    let dir = tempfile::tempdir().unwrap();
    let output = gatewatch_cmd(dir.path())
        .args(["--output", "yaml", "status"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(text.contains("invalid") || text.contains("possible values"));
}

#[test]
fn test_unknown_profile() {
    let dir = tempfile::tempdir().unwrap();
    let output = gatewatch_cmd(dir.path())
        .args(["--profile", "ghost", "devices", "list"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(combined_output(&output).contains("ghost"));
}

#[test]
fn test_unreachable_gateway_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let output = gatewatch_cmd(dir.path())
        .args(["--gateway", "http://127.0.0.1:9/api", "--timeout", "2", "status"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(7));
    assert!(combined_output(&output).contains("unavailable"));
}

#[test]
fn test_remove_requires_yes_without_terminal() {
    let dir = tempfile::tempdir().unwrap();
    let output = gatewatch_cmd(dir.path())
        .args(["--gateway", "http://127.0.0.1:9/api", "devices", "remove", "Line-1"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("--yes"));
}

#[test]
fn test_bad_pm_param_is_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    let output = gatewatch_cmd(dir.path())
        .args([
            "--gateway",
            "http://127.0.0.1:9/api",
            "devices",
            "add",
            "PM-2",
            "--type",
            "pm",
            "--ip",
            "10.0.0.9",
            "--pm-param",
            "voltage_l1",
        ])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("NAME=ADDRESS"));
}

// ── Against a mock gateway ──────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_status_json_reports_connectivity() {
    let server = mock_gateway().await;
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = gatewatch_cmd(dir.path());
    cmd.args([
        "--gateway",
        &format!("{}/api", server.uri()),
        "--output",
        "json",
        "status",
    ]);

    let output = run(cmd).await;
    assert!(output.status.success(), "{}", combined_output(&output));

    let view: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(view["state"], "devices");
    assert_eq!(view["devices"][0]["connectivity"], "online");
    assert_eq!(view["devices"][0]["values"]["good_count"], 120.0);
    assert_eq!(view["devices"][1]["connectivity"], "offline");
    assert_eq!(view["devices"][1]["error"], "Connection refused");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_status_filters() {
    let server = mock_gateway().await;
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = gatewatch_cmd(dir.path());
    cmd.args([
        "--gateway",
        &format!("{}/api", server.uri()),
        "--output",
        "plain",
        "status",
        "--state",
        "offline",
    ]);

    let output = run(cmd).await;
    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "PM-1");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_devices_list_plain() {
    let server = mock_gateway().await;
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = gatewatch_cmd(dir.path());
    cmd.args([
        "--gateway",
        &format!("{}/api", server.uri()),
        "-o",
        "plain",
        "devices",
        "list",
        "--kind",
        "pm",
    ]);

    let output = run(cmd).await;
    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "PM-1");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_devices_get_missing_is_not_found() {
    let server = mock_gateway().await;
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = gatewatch_cmd(dir.path());
    cmd.args([
        "--gateway",
        &format!("{}/api", server.uri()),
        "devices",
        "get",
        "Ghost",
    ]);

    let output = run(cmd).await;
    assert_eq!(output.status.code(), Some(4));
    assert!(combined_output(&output).contains("devices list"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_duplicate_add_shows_gateway_message() {
    let server = mock_gateway().await;
    Mock::given(method("POST"))
        .and(path("/api/devices"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({ "detail": "Device Line-1 already exists" })),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut cmd = gatewatch_cmd(dir.path());
    cmd.args([
        "--gateway",
        &format!("{}/api", server.uri()),
        "devices",
        "add",
        "Line-1",
        "--type",
        "oee",
        "--ip",
        "10.0.0.2",
    ]);

    let output = run(cmd).await;
    assert_eq!(output.status.code(), Some(6));
    assert!(combined_output(&output).contains("Device Line-1 already exists"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_pm_defaults_plain() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/pm-defaults"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "params": [["voltage_l1", 3027], ["current_l1", 2999]]
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut cmd = gatewatch_cmd(dir.path());
    cmd.args([
        "--gateway",
        &format!("{}/api", server.uri()),
        "-o",
        "plain",
        "pm-defaults",
    ]);

    let output = run(cmd).await;
    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        "voltage_l1=3027\ncurrent_l1=2999"
    );
}
