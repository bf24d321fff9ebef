//! Integration tests for the `sleepiq` CLI binary.
//!
//! Argument parsing, help output, completions and error exit codes run
//! without any network; the account-bound commands run against a local
//! wiremock server passed in through `SLEEPIQ_BASE_URL`.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

const SANDBOX: &str = "/tmp/sleepiq-cli-test-nonexistent";

/// Build a command for the `sleepiq` binary with env isolation.
///
/// Clears all `SLEEPIQ_*` env vars and points config directories at a
/// nonexistent path so tests never touch the user's real configuration.
fn sleepiq_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("sleepiq");
    cmd.env("HOME", SANDBOX)
        .env("XDG_CONFIG_HOME", SANDBOX)
        .env("XDG_DATA_HOME", SANDBOX)
        .env_remove("SLEEPIQ_PROFILE")
        .env_remove("SLEEPIQ_EMAIL")
        .env_remove("SLEEPIQ_PASSWORD")
        .env_remove("SLEEPIQ_BASE_URL")
        .env_remove("SLEEPIQ_OUTPUT")
        .env_remove("SLEEPIQ_TIMEOUT")
        .env_remove("RUST_LOG");
    cmd
}

/// `sleepiq_cmd()` wired to a mock account.
fn account_cmd(server: &MockServer) -> assert_cmd::Command {
    let mut cmd = sleepiq_cmd();
    cmd.env("SLEEPIQ_BASE_URL", format!("{}/rest/", server.uri()))
        .env("SLEEPIQ_EMAIL", "sleeper@example.com")
        .env("SLEEPIQ_PASSWORD", "hunter2");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

/// A mock account with one bed and no foundation. The runtime must stay
/// alive for as long as the server is used.
fn mock_account() -> (tokio::runtime::Runtime, MockServer) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let server = rt.block_on(async {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/rest/login"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "userID": "U-42", "key": "session-key" })),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/bed/familyStatus"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "beds": [{
                    "status": 1,
                    "bedId": "B1",
                    "leftSide": { "isInBed": true, "sleepNumber": 30 },
                    "rightSide": { "isInBed": false, "sleepNumber": 45 }
                }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/bed/B1/foundation/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Error": { "Code": 404, "Message": "No Foundation Device" }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/bed/B1/pauseMode"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "pauseMode": "off" })))
            .mount(&server)
            .await;
        server
    });
    (rt, server)
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = sleepiq_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    sleepiq_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("SleepIQ")
            .and(predicate::str::contains("run"))
            .and(predicate::str::contains("status"))
            .and(predicate::str::contains("set"))
            .and(predicate::str::contains("pump")),
    );
}

#[test]
fn test_version_flag() {
    sleepiq_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("sleepiq"));
}

#[test]
fn test_set_help_lists_controls() {
    sleepiq_cmd().args(["set", "--help"]).assert().success().stdout(
        predicate::str::contains("sleep-number")
            .and(predicate::str::contains("privacy"))
            .and(predicate::str::contains("foot-warmer"))
            .and(predicate::str::contains("flex")),
    );
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    sleepiq_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    sleepiq_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("sleepiq"));
}

// ── Usage errors ────────────────────────────────────────────────────

#[test]
fn test_sleep_number_out_of_range() {
    let output = sleepiq_cmd()
        .args(["set", "sleep-number", "left", "101"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_foot_warmer_level_out_of_range() {
    let output = sleepiq_cmd()
        .args(["set", "foot-warmer", "right", "4"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

// ── Configuration errors ────────────────────────────────────────────

#[test]
fn test_status_without_credentials() {
    let output = sleepiq_cmd().arg("status").output().unwrap();
    assert_eq!(output.status.code(), Some(3), "Expected auth exit code");
    let text = combined_output(&output);
    assert!(
        text.contains("No credentials"),
        "Expected credentials error:\n{text}"
    );
}

#[test]
fn test_unknown_profile() {
    let output = sleepiq_cmd()
        .args(["--profile", "cabin", "status"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4));
    assert!(combined_output(&output).contains("cabin"));
}

#[test]
fn test_config_show_without_file() {
    sleepiq_cmd()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[defaults]"));
}

// ── Against a mock account ──────────────────────────────────────────

#[test]
fn test_status_json_lists_facets() {
    let (_rt, server) = mock_account();

    let output = account_cmd(&server)
        .args(["status", "--output", "json"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));

    let facets: Vec<Value> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(facets.len(), 7);

    let left = facets
        .iter()
        .find(|f| f["name"] == "bed0leftSidenumber")
        .unwrap();
    assert_eq!(left["values"]["sleep_number"], 30);

    let any = facets
        .iter()
        .find(|f| f["name"] == "bed0anySideoccupancy")
        .unwrap();
    assert_eq!(any["values"]["occupancy_detected"], true);
}

#[test]
fn test_status_unknown_bed() {
    let (_rt, server) = mock_account();
    let output = account_cmd(&server)
        .args(["status", "--bed", "B9"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4));
}

#[test]
fn test_set_privacy_sends_pause_mode() {
    let (rt, server) = mock_account();
    rt.block_on(
        Mock::given(method("PUT"))
            .and(path("/rest/bed/B1/pauseMode"))
            .and(query_param("mode", "on"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "pauseMode": "on" })))
            .expect(1)
            .mount(&server),
    );

    account_cmd(&server)
        .args(["set", "privacy", "on"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Privacy mode on"));

    rt.block_on(server.verify());
}

#[test]
fn test_set_force_idle_stops_pump() {
    let (rt, server) = mock_account();
    rt.block_on(
        Mock::given(method("PUT"))
            .and(path("/rest/bed/B1/pump/forceIdle"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server),
    );

    account_cmd(&server)
        .args(["set", "force-idle"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Pump forced idle"));

    rt.block_on(server.verify());
}

#[test]
fn test_pump_json_includes_account_and_sleep_numbers() {
    let (rt, server) = mock_account();
    rt.block_on(async {
        Mock::given(method("GET"))
            .and(path("/rest/registration"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "accountId": "A-7" })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/bed/B1/pump/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "activeTask": 0,
                "chamberType": 1,
                "leftSideSleepNumber": 30,
                "rightSideSleepNumber": 45
            })))
            .mount(&server)
            .await;
    });

    let output = account_cmd(&server)
        .args(["pump", "--output", "json"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));

    let pumps: Vec<Value> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(pumps.len(), 1);
    assert_eq!(pumps[0]["account_id"], "A-7");
    assert_eq!(pumps[0]["bed_id"], "B1");
    assert_eq!(pumps[0]["right_sleep_number"], 45);
}

#[test]
fn test_rejected_login_exits_with_auth_code() {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let server = rt.block_on(async {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/rest/login"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "Error": { "Code": 401, "Message": "Incorrect username or password" }
            })))
            .mount(&server)
            .await;
        server
    });

    let output = account_cmd(&server).arg("status").output().unwrap();
    assert_eq!(output.status.code(), Some(3));
    assert!(combined_output(&output).contains("Authentication failed"));
}
