//! End-to-end tests for the `github-notifier` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[path = "../helpers/mod.rs"]
mod helpers;

use helpers::config_file;

fn notifier() -> Command {
    let mut cmd = Command::cargo_bin("github-notifier").unwrap();
    cmd.env_clear();
    cmd
}

const VALID_TOML: &str = r#"
    [sources.repo]
    type = "github-webhook"
    enabled = true
    notifyTo = ["dc"]
    [sources.repo.config]
    webhookSecret = "secret"

    [destinations.dc]
    type = "discord"
    enabled = true
    [destinations.dc.config]
    webhookUrl = "https://discord.example/hook"
"#;

#[test]
fn test_check_accepts_valid_configuration() {
    let file = config_file(VALID_TOML, "toml");

    notifier()
        .arg("--config")
        .arg(file.path())
        .arg("check")
        .assert()
        .success()
        .stderr(predicate::str::contains("Configuration is valid."));
}

#[test]
fn test_check_rejects_dangling_destination() {
    let file = config_file(VALID_TOML, "toml");

    notifier()
        .arg("--config")
        .arg(file.path())
        .env("ENV_SOURCE_REPO_NOTIFY_TO", "dc,ghost")
        .arg("check")
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Invalid notifyTo destination: ghost for source repo",
        ));
}

#[test]
fn test_check_rejects_missing_required_field() {
    notifier()
        .env("ENV_DESTINATION_MK_TYPE", "misskey")
        .env("ENV_DESTINATION_MK_CONFIG_URL", "https://misskey.example")
        .arg("check")
        .assert()
        .failure()
        .stderr(predicate::str::contains("token is required for destination mk"));
}

#[test]
fn test_missing_config_file_fails() {
    notifier()
        .arg("--config")
        .arg("/path/to/non/existent/notifier.toml")
        .arg("check")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load configuration"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_send_delivers_content_from_stdin() {
    let discord = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&discord)
        .await;

    let file = config_file(VALID_TOML, "toml");
    let webhook_url = format!("{}/hook", discord.uri());
    let config_path = file.path().to_path_buf();

    tokio::task::spawn_blocking(move || {
        notifier()
            .arg("--config")
            .arg(&config_path)
            .env("ENV_DESTINATION_DC_CONFIG_WEBHOOK_URL", &webhook_url)
            .args(["send", "--source", "repo"])
            .write_stdin("build passed\n")
            .assert()
            .success();
    })
    .await
    .unwrap();

    let requests = discord.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body, json!({ "content": "build passed" }));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_send_exits_cleanly_when_delivery_fails() {
    let discord = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&discord)
        .await;

    let file = config_file(VALID_TOML, "toml");
    let webhook_url = format!("{}/hook", discord.uri());
    let config_path = file.path().to_path_buf();

    tokio::task::spawn_blocking(move || {
        notifier()
            .arg("--config")
            .arg(&config_path)
            .env("ENV_DESTINATION_DC_CONFIG_WEBHOOK_URL", &webhook_url)
            .args(["send", "--source", "repo", "--content", "hello"])
            .assert()
            .success()
            .stderr(predicate::str::contains("Discord webhook error"));
    })
    .await
    .unwrap();
}

#[test]
fn test_send_to_disabled_source_is_dropped() {
    let file = config_file(VALID_TOML, "toml");

    notifier()
        .arg("--config")
        .arg(file.path())
        .env("ENV_SOURCE_REPO_ENABLED", "false")
        .args(["send", "--source", "repo", "--content", "hello"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Source is disabled"));
}
