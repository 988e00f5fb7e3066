//! Integration tests for dispatching payloads through the notifier.

use github_notifier::config::{Config, Settings};
use github_notifier::core::{DestinationKind, NotificationPayload, NotificationService};
use github_notifier::notification::test_utils::{DeliveryLog, RecordingService};
use github_notifier::notification::Notifier;
use github_notifier::services::setup_notifier;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_test::traced_test;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[path = "../helpers/mod.rs"]
mod helpers;

use helpers::env;

fn settings() -> Settings {
    Settings {
        log_level: "debug".to_string(),
        http_timeout_seconds: 5,
    }
}

/// Source `s` notifies `d1` (misskey), `d2` (discord) and `d3` (discord, disabled).
fn routing_config(misskey_url: &str, discord_url: &str) -> Arc<Config> {
    let config = Config::resolve(
        Default::default(),
        &env(&[
            ("ENV_SOURCE_S_TYPE", "github-webhook"),
            ("ENV_SOURCE_S_ENABLED", "true"),
            ("ENV_SOURCE_S_NOTIFY_TO", "d1,d2,d3"),
            ("ENV_SOURCE_S_CONFIG_WEBHOOK_SECRET", "secret"),
            ("ENV_DESTINATION_D1_TYPE", "misskey"),
            ("ENV_DESTINATION_D1_ENABLED", "true"),
            ("ENV_DESTINATION_D1_CONFIG_URL", misskey_url),
            ("ENV_DESTINATION_D1_CONFIG_TOKEN", "mk-token"),
            ("ENV_DESTINATION_D2_TYPE", "discord"),
            ("ENV_DESTINATION_D2_ENABLED", "true"),
            ("ENV_DESTINATION_D2_CONFIG_WEBHOOK_URL", discord_url),
            ("ENV_DESTINATION_D3_TYPE", "discord"),
            ("ENV_DESTINATION_D3_CONFIG_WEBHOOK_URL", discord_url),
        ]),
    )
    .unwrap();
    Arc::new(config)
}

/// An address on which nothing accepts connections.
fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

async fn request_bodies(server: &MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|request| serde_json::from_slice(&request.body).unwrap())
        .collect()
}

#[tokio::test]
async fn test_send_reaches_each_live_destination_once() {
    // Arrange
    let misskey = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/notes/create"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&misskey)
        .await;
    let discord = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/webhook"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&discord)
        .await;

    let config = routing_config(
        &format!("{}/", misskey.uri()),
        &format!("{}/webhook", discord.uri()),
    );
    let notifier = setup_notifier(config, &settings()).unwrap();
    assert_eq!(notifier.len(), 2);

    // Act
    notifier
        .send(&NotificationPayload::new("s", "hello"))
        .await;

    // Assert
    assert_eq!(
        request_bodies(&misskey).await,
        vec![json!({ "i": "mk-token", "text": "hello", "visibility": "home" })]
    );
    // Only the enabled discord destination posts, and without null override keys.
    assert_eq!(
        request_bodies(&discord).await,
        vec![json!({ "content": "hello" })]
    );
}

#[tokio::test]
async fn test_failing_destination_does_not_block_sibling() {
    let misskey = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .expect(1)
        .mount(&misskey)
        .await;
    let discord = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&discord)
        .await;

    let notifier = setup_notifier(
        routing_config(&misskey.uri(), &format!("{}/webhook", discord.uri())),
        &settings(),
    )
    .unwrap();

    notifier
        .send(&NotificationPayload::new("s", "hello"))
        .await;

    misskey.verify().await;
    discord.verify().await;
}

#[tokio::test]
#[traced_test]
async fn test_unreachable_destination_does_not_block_sibling() {
    let unreachable = closed_port_url();
    let discord = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&discord)
        .await;

    let notifier = setup_notifier(
        routing_config(&unreachable, &format!("{}/webhook", discord.uri())),
        &settings(),
    )
    .unwrap();

    notifier
        .send(&NotificationPayload::new("s", "hello"))
        .await;

    discord.verify().await;
    assert!(logs_contain("Error sending Misskey notification"));
    assert!(!logs_contain("Misskey API error"));
}

#[tokio::test]
async fn test_deliveries_run_concurrently() {
    let delay = Duration::from_millis(800);
    let misskey = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(delay))
        .mount(&misskey)
        .await;
    let discord = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(204).set_delay(delay))
        .mount(&discord)
        .await;

    let notifier = setup_notifier(
        routing_config(&misskey.uri(), &format!("{}/webhook", discord.uri())),
        &settings(),
    )
    .unwrap();

    let start = Instant::now();
    notifier
        .send(&NotificationPayload::new("s", "hello"))
        .await;
    let elapsed = start.elapsed();

    assert!(elapsed >= delay);
    assert!(
        elapsed < delay * 2,
        "deliveries should overlap, took {:?}",
        elapsed
    );
}

#[tokio::test]
async fn test_unknown_source_sends_nothing() {
    let misskey = MockServer::start().await;
    let discord = MockServer::start().await;
    let notifier = setup_notifier(
        routing_config(&misskey.uri(), &format!("{}/webhook", discord.uri())),
        &settings(),
    )
    .unwrap();

    notifier
        .send(&NotificationPayload::new("unknown", "hello"))
        .await;

    assert!(request_bodies(&misskey).await.is_empty());
    assert!(request_bodies(&discord).await.is_empty());
}

#[tokio::test]
async fn test_panicking_service_is_isolated() {
    let config = routing_config("https://misskey.example", "https://discord.example/hook");
    let log = DeliveryLog::default();
    let misskey_log = log.clone();
    let discord_log = log.clone();

    let notifier = Notifier::builder(config)
        .register(DestinationKind::Misskey, move |d| {
            Ok(Arc::new(RecordingService::panicking(&d.id, misskey_log.clone()))
                as Arc<dyn NotificationService>)
        })
        .register(DestinationKind::Discord, move |d| {
            Ok(Arc::new(RecordingService::new(&d.id, discord_log.clone()))
                as Arc<dyn NotificationService>)
        })
        .build();

    notifier
        .send(&NotificationPayload::new("s", "hello"))
        .await;
    notifier
        .send(&NotificationPayload::new("s", "again"))
        .await;

    let entries = log.entries();
    assert_eq!(entries.len(), 4);
    for id in ["d1", "d2"] {
        assert_eq!(entries.iter().filter(|(d, _)| d == id).count(), 2);
    }
}
