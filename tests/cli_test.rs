//! Binary-level tests for the `feedsync` CLI.

mod common;

use assert_cmd::Command;
use feedsync::test_utils::{TestDir, make_test_config_toml};
use predicates::prelude::*;
use serde_json::{Value, json};
use wiremock::matchers::path;
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::logger::TestLogger;

fn feedsync() -> Command {
    let mut cmd = Command::cargo_bin("feedsync").unwrap();
    cmd.env_remove("FEEDSYNC_CONFIG")
        .env_remove("FEEDSYNC_POLL_INTERVAL")
        .env_remove("FEEDSYNC_DEBOUNCE_MS")
        .env_remove("RUST_LOG");
    cmd
}

fn config_against(api_base: &str) -> String {
    format!(
        r#"[sync]
api_base = "{api_base}"
timeout_seconds = 5

[accounts.main]
ltoken_v2 = "v2_ltoken_main"
ltuid_v2 = "100200300"
ltmid_v2 = "mid_main"

[accounts.main.uids]
genshin = "600000001"
"#
    )
}

// =============================================================================
// Informational commands
// =============================================================================

#[test]
fn help_lists_commands() {
    feedsync()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("watch"))
        .stdout(predicate::str::contains("refresh"))
        .stdout(predicate::str::contains("check-config"));
}

#[test]
fn data_types_human() {
    feedsync()
        .arg("data-types")
        .assert()
        .success()
        .stdout(predicate::str::contains("Genshin Impact:"))
        .stdout(predicate::str::contains("genshin:daily-note"))
        .stdout(predicate::str::contains("zzz:shiyu-defense"));
}

#[test]
fn data_types_json() {
    let output = feedsync().args(["--json", "data-types"]).output().unwrap();
    assert!(output.status.success());
    let keys: Vec<String> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(keys.len(), 8);
    assert!(keys.contains(&"starrail:forgotten-hall".to_string()));
}

#[test]
fn unknown_command_fails() {
    feedsync()
        .arg("frobnicate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

// =============================================================================
// check-config
// =============================================================================

#[test]
fn check_config_accepts_valid_file() {
    let log = TestLogger::new("check_config_accepts_valid_file");
    let dir = TestDir::new();
    dir.create_file("config.toml", &make_test_config_toml());

    feedsync()
        .args(["check-config", "--config"])
        .arg(dir.file_path("config.toml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Config OK"))
        .stdout(predicate::str::contains("main: genshin, starrail"));
    log.finish_ok();
}

#[test]
fn check_config_json_summary() {
    let dir = TestDir::new();
    dir.create_file("config.toml", &make_test_config_toml());

    let output = feedsync()
        .args(["--json", "check-config", "--config"])
        .arg(dir.file_path("config.toml"))
        .output()
        .unwrap();
    assert!(output.status.success());
    let summary: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["valid"], json!(true));
    assert_eq!(summary["pollIntervalSecs"], json!(300));
    assert_eq!(
        summary["accounts"]["main"]["services"],
        json!(["genshin", "starrail"])
    );
}

#[test]
fn check_config_rejects_invalid_values() {
    let dir = TestDir::new();
    dir.create_file("config.toml", "[sync]\npoll_interval_secs = 1\n");

    feedsync()
        .args(["check-config", "--config"])
        .arg(dir.file_path("config.toml"))
        .assert()
        .code(3)
        .stderr(predicate::str::contains("poll_interval_secs"));
}

#[test]
fn check_config_rejects_malformed_toml() {
    let dir = TestDir::new();
    dir.create_file("config.toml", "[sync\npoll_interval_secs = ");

    feedsync()
        .args(["check-config", "--config"])
        .arg(dir.file_path("config.toml"))
        .assert()
        .code(3)
        .stderr(predicate::str::contains("config parse error"));
}

#[test]
fn config_path_from_env() {
    let dir = TestDir::new();
    dir.create_file("config.toml", &make_test_config_toml());

    feedsync()
        .env("FEEDSYNC_CONFIG", dir.file_path("config.toml"))
        .arg("check-config")
        .assert()
        .success();
}

// =============================================================================
// refresh
// =============================================================================

#[test]
fn refresh_unknown_account_fails() {
    let dir = TestDir::new();
    dir.create_file("config.toml", &make_test_config_toml());

    feedsync()
        .args(["refresh", "--account", "nobody", "--service", "genshin", "--config"])
        .arg(dir.file_path("config.toml"))
        .assert()
        .code(3)
        .stderr(predicate::str::contains("account not found: nobody"));
}

#[test]
fn refresh_rejects_foreign_data_type() {
    let dir = TestDir::new();
    dir.create_file("config.toml", &make_test_config_toml());

    feedsync()
        .args([
            "refresh",
            "--account",
            "main",
            "--service",
            "genshin",
            "--data-type",
            "zzz:daily-note",
            "--config",
        ])
        .arg(dir.file_path("config.toml"))
        .assert()
        .code(3);
}

#[test]
fn refresh_rejects_unknown_service() {
    feedsync()
        .args(["refresh", "--account", "main", "--service", "honkai3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("honkai3"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn refresh_prints_entries_as_json() {
    let log = TestLogger::new("refresh_prints_entries_as_json");
    let server = MockServer::start().await;
    Mock::given(path("/game_record/genshin/api/dailyNote"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "retcode": 0,
            "message": "OK",
            "data": {"current_resin": 42}
        })))
        .mount(&server)
        .await;

    let dir = TestDir::new();
    dir.create_file("config.toml", &config_against(&server.uri()));

    log.phase("act");
    let config = dir.file_path("config.toml");
    let output = tokio::task::spawn_blocking(move || {
        feedsync()
            .args([
                "--json",
                "refresh",
                "--account",
                "main",
                "--service",
                "genshin",
                "--data-type",
                "genshin:daily-note",
                "--config",
            ])
            .arg(config)
            .output()
            .unwrap()
    })
    .await
    .unwrap();

    log.phase("verify");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 1);
    let line: Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(line["account"], json!("main"));
    assert_eq!(line["dataType"], json!("genshin:daily-note"));
    assert_eq!(line["entry"]["status"], json!("ok"));
    assert_eq!(line["entry"]["data"]["current_resin"], json!(42));
    log.finish_ok();
}
