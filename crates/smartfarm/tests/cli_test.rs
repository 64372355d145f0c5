//! Integration tests for the `smartfarm` CLI binary.
//!
//! Argument parsing, help output, completions and config handling run
//! without a backend; the HTTP cases talk to a wiremock server.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `smartfarm` binary with env isolation.
///
/// Clears all `SMARTFARM_*` env vars and points config directories at
/// `home` so tests never touch the user's real configuration.
fn smartfarm_cmd(home: &std::path::Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("smartfarm");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("SMARTFARM_PROFILE")
        .env_remove("SMARTFARM_API_URL")
        .env_remove("SMARTFARM_WS_URL")
        .env_remove("SMARTFARM_TOKEN")
        .env_remove("SMARTFARM_OUTPUT")
        .env_remove("SMARTFARM_INSECURE")
        .env_remove("SMARTFARM_TIMEOUT")
        .env_remove("SMARTFARM_EMAIL")
        .env_remove("SMARTFARM_PASSWORD")
        .env_remove("RUST_LOG");
    cmd
}

/// Command pointed at a mock backend with a fixed token, so no keyring
/// lookup or login happens.
fn backend_cmd(home: &std::path::Path, server: &MockServer) -> assert_cmd::Command {
    let mut cmd = smartfarm_cmd(home);
    cmd.env("SMARTFARM_API_URL", format!("{}/api", server.uri()))
        .env("SMARTFARM_TOKEN", "test-token");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

fn farmer_json(id: &str) -> serde_json::Value {
    json!({
        "id": id,
        "firstName": "Amina",
        "lastName": "Okafor",
        "email": "amina@example.com",
        "phone": "+234-800-000",
        "farmSize": 12.5,
        "crops": ["maize", "cassava"],
        "status": "active"
    })
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let home = tempfile::tempdir().unwrap();
    let output = smartfarm_cmd(home.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    let home = tempfile::tempdir().unwrap();
    smartfarm_cmd(home.path()).arg("--help").assert().success().stdout(
        predicate::str::contains("farmers")
            .and(predicate::str::contains("crops"))
            .and(predicate::str::contains("prices"))
            .and(predicate::str::contains("reports"))
            .and(predicate::str::contains("watch")),
    );
}

#[test]
fn test_version_flag() {
    let home = tempfile::tempdir().unwrap();
    smartfarm_cmd(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("smartfarm"));
}

#[test]
fn test_reports_help_lists_subcommands() {
    let home = tempfile::tempdir().unwrap();
    smartfarm_cmd(home.path()).args(["reports", "--help"]).assert().success().stdout(
        predicate::str::contains("generate")
            .and(predicate::str::contains("status"))
            .and(predicate::str::contains("download")),
    );
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    let home = tempfile::tempdir().unwrap();
    smartfarm_cmd(home.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    let home = tempfile::tempdir().unwrap();
    smartfarm_cmd(home.path())
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

#[test]
fn test_completions_fish() {
    let home = tempfile::tempdir().unwrap();
    smartfarm_cmd(home.path())
        .args(["completions", "fish"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let home = tempfile::tempdir().unwrap();
    let output = smartfarm_cmd(home.path()).arg("foobar").output().unwrap();
    assert!(!output.status.success(), "Expected failure for invalid subcommand");
    let text = combined_output(&output);
    assert!(
        text.contains("unrecognized") || text.contains("foobar"),
        "Expected error mentioning invalid subcommand:\n{text}"
    );
}

#[test]
fn test_invalid_output_format() {
    let home = tempfile::tempdir().unwrap();
    let output = smartfarm_cmd(home.path())
        .args(["--output", "invalid", "farmers", "list"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(
        text.contains("invalid") || text.contains("possible values"),
        "Expected error about output format:\n{text}"
    );
}

#[test]
fn test_unknown_profile_is_reported() {
    let home = tempfile::tempdir().unwrap();
    smartfarm_cmd(home.path())
        .args(["--profile", "nope", "farmers", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nope"));
}

#[test]
fn test_delete_without_yes_refuses_non_interactive() {
    let home = tempfile::tempdir().unwrap();
    let output = smartfarm_cmd(home.path())
        .args(["--token", "t", "--api-url", "http://127.0.0.1:9/api", "farmers", "delete", "f-1"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("--yes"));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_show_no_config() {
    // `config show` falls back to the default config when no file exists.
    let home = tempfile::tempdir().unwrap();
    smartfarm_cmd(home.path()).args(["config", "show"]).assert().success();
}

#[test]
fn test_config_set_then_show() {
    let home = tempfile::tempdir().unwrap();
    smartfarm_cmd(home.path())
        .args(["config", "set", "api_url", "https://farm.example.com/api"])
        .assert()
        .success();
    smartfarm_cmd(home.path())
        .args(["config", "set", "realtime", "false"])
        .assert()
        .success();

    smartfarm_cmd(home.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("https://farm.example.com/api")
                .and(predicate::str::contains("realtime = false")),
        );
}

#[test]
fn test_config_set_rejects_bad_url() {
    let home = tempfile::tempdir().unwrap();
    smartfarm_cmd(home.path())
        .args(["config", "set", "api_url", "not a url"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("api_url"));
}

#[test]
fn test_config_use_unknown_profile() {
    let home = tempfile::tempdir().unwrap();
    smartfarm_cmd(home.path())
        .args(["config", "use", "staging"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("staging"));
}

// ── Against a mock backend ──────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_farmers_list_table() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/farmers"))
        .and(query_param("page", "1"))
        .and(query_param("limit", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [farmer_json("f-1"), farmer_json("f-2")],
            "total": 2,
            "page": 1,
            "limit": 10,
            "totalPages": 1
        })))
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();
    backend_cmd(home.path(), &server)
        .args(["farmers", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Amina Okafor").and(predicate::str::contains("f-2")))
        .stderr(predicate::str::contains("page 1/1 (2 total)"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_farmers_list_plain_prints_ids() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/farmers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [farmer_json("f-1"), farmer_json("f-2")],
            "total": 2,
            "page": 1,
            "limit": 10,
            "totalPages": 1
        })))
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();
    backend_cmd(home.path(), &server)
        .args(["-o", "plain", "farmers", "list"])
        .assert()
        .success()
        .stdout("f-1\nf-2\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_farmer_get_not_found_exit_code() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/farmers/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "Not found."})))
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();
    backend_cmd(home.path(), &server)
        .args(["farmers", "get", "missing"])
        .assert()
        .code(4);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_prices_commodities_json() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/market-prices/commodities"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["cassava", "maize"])))
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();
    let output = backend_cmd(home.path(), &server)
        .args(["-o", "json-compact", "prices", "commodities"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(parsed, json!(["cassava", "maize"]));
}

fn recommendation_json(id: &str, status: &str) -> serde_json::Value {
    json!({
        "id": id,
        "type": "irrigation",
        "title": "Irrigate north field",
        "description": "Soil moisture below 20%",
        "priority": "high",
        "status": status,
        "relatedEntityType": "field",
        "relatedEntityId": "fld-1"
    })
}

#[tokio::test(flavor = "multi_thread")]
async fn test_recommendation_status_patches_backend() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/api/recommendations/r-1/status"))
        .and(body_json(json!({"status": "completed", "notes": "done"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(recommendation_json("r-1", "completed")))
        .expect(1)
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();
    backend_cmd(home.path(), &server)
        .args(["-o", "plain", "recommendations", "status", "r-1", "completed", "--notes", "done"])
        .assert()
        .success()
        .stdout("completed\n")
        .stderr(predicate::str::contains("Recommendation status updated"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_recommendations_for_entity_lists_ids() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/field/fld-1/recommendations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            recommendation_json("r-1", "pending"),
            recommendation_json("r-2", "in_progress")
        ])))
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();
    backend_cmd(home.path(), &server)
        .args(["-o", "plain", "rec", "for", "field", "fld-1"])
        .assert()
        .success()
        .stdout("r-1\nr-2\n");
}

#[test]
fn test_recommendation_status_rejects_unknown_value() {
    let home = tempfile::tempdir().unwrap();
    smartfarm_cmd(home.path())
        .args(["--token", "t", "--api-url", "http://127.0.0.1:9/api", "recommendations", "status", "r-1", "done"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("in_progress"));
}

#[test]
fn test_unreachable_backend_exit_code() {
    let home = tempfile::tempdir().unwrap();
    smartfarm_cmd(home.path())
        .args(["--token", "t", "--api-url", "http://127.0.0.1:9/api", "--timeout", "2", "dashboard", "summary"])
        .assert()
        .failure();
}
