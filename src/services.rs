//! Encapsulation for setting up external services.

use crate::{
    config::{Config, Settings},
    notification::Notifier,
};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Builds the HTTP client shared by every outbound service.
pub fn build_http_client(settings: &Settings) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(settings.http_timeout_seconds))
        .build()
        .context("failed to build HTTP client")
}

/// Sets up the dispatch registry for the resolved configuration.
pub fn setup_notifier(config: Arc<Config>, settings: &Settings) -> Result<Notifier> {
    let client = build_http_client(settings)?;
    let notifier = Notifier::new(config, client);
    info!(
        services = notifier.len(),
        timeout_seconds = settings.http_timeout_seconds,
        "Notification pipeline ready."
    );
    Ok(notifier)
}
