//! github-notifier - webhook notification router
//!
//! Resolves the routing configuration at startup and either validates it
//! (`check`) or dispatches a single payload to the configured destinations
//! (`send`).

use anyhow::{Context, Result};
use clap::Parser;
use github_notifier::{
    cli::{Cli, Command},
    config::{AppConfig, Config, Environment},
    core::NotificationPayload,
    services::setup_notifier,
};
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration by layering sources: defaults, file, CONFIG, environment, and CLI args.
    let app_config = AppConfig::load(&cli).unwrap_or_else(|err| {
        // Initialize a default logger just for this error
        init_tracing("info");
        error!("Failed to load configuration: {}", err);
        std::process::exit(1);
    });
    let (settings, structured) = app_config.split();

    init_tracing(&settings.log_level);
    info!("github-notifier starting up...");

    let env = process_environment();
    let config = Arc::new(
        Config::resolve(structured, &env).context("Invalid notifier configuration")?,
    );
    log_configuration(&config);

    match cli.command.clone().unwrap_or(Command::Check) {
        Command::Check => {
            info!("Configuration is valid.");
        }
        Command::Send { source, content } => {
            let content = match content {
                Some(content) => content,
                None => read_stdin().await?,
            };

            if config.source(&source).is_some_and(|s| !s.enabled) {
                warn!(source = %source, "Source is disabled, dropping payload");
                return Ok(());
            }

            let notifier = setup_notifier(config.clone(), &settings)?;
            notifier
                .send(&NotificationPayload::new(source, content))
                .await;
            info!("Dispatch finished.");
        }
    }

    Ok(())
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Snapshot of the process environment, skipping entries that are not valid UTF-8.
fn process_environment() -> Environment {
    std::env::vars_os()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
        .collect()
}

async fn read_stdin() -> Result<String> {
    let mut content = String::new();
    tokio::io::stdin()
        .read_to_string(&mut content)
        .await
        .context("failed to read payload content from stdin")?;
    Ok(content.trim_end().to_string())
}

fn log_configuration(config: &Config) {
    info!("-------------------- Configuration --------------------");
    for source in config.sources().values() {
        info!(
            "Source {}: type={}, enabled={}, notifyTo={:?}",
            source.id,
            source.kind(),
            source.enabled,
            source.notify_to
        );
    }
    for destination in config.destinations().values() {
        info!(
            "Destination {}: type={}, enabled={}",
            destination.id,
            destination.kind(),
            destination.enabled
        );
    }
    if config.sources().is_empty() {
        warn!("No sources configured; every payload will be dropped.");
    }
    info!("-------------------------------------------------------");
}
