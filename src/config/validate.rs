//! Turns merged partial entities into validated ones.
//!
//! Each family keeps a tag → validator table; a merged entity whose tag has
//! no entry is dropped, every other entity is either fully validated or
//! aborts resolution.

use crate::config::partial::{PartialDestination, PartialOptions, PartialSource};
use crate::config::ConfigError;
use crate::core::{
    DebugOptions, Destination, DestinationConfig, DestinationKind, DiscordConfig, EntityOptions,
    GithubWebhookConfig, MisskeyConfig, PostVisibility, Source, SourceConfig, SourceKind,
};

type SourceValidator = fn(&str, PartialSource) -> Result<Source, ConfigError>;
type DestinationValidator = fn(&str, PartialDestination) -> Result<Destination, ConfigError>;

fn source_validator(kind: SourceKind) -> SourceValidator {
    match kind {
        SourceKind::GithubWebhook => github_webhook,
    }
}

fn destination_validator(kind: DestinationKind) -> DestinationValidator {
    match kind {
        DestinationKind::Misskey => misskey,
        DestinationKind::Discord => discord,
    }
}

/// Validates a merged source. Returns `Ok(None)` when its tag is not a known variant.
pub fn validate_source(id: &str, partial: PartialSource) -> Result<Option<Source>, ConfigError> {
    match partial.kind.as_deref().and_then(SourceKind::from_tag) {
        Some(kind) => source_validator(kind)(id, partial).map(Some),
        None => Ok(None),
    }
}

/// Validates a merged destination. Returns `Ok(None)` when its tag is not a known variant.
pub fn validate_destination(
    id: &str,
    partial: PartialDestination,
) -> Result<Option<Destination>, ConfigError> {
    match partial.kind.as_deref().and_then(DestinationKind::from_tag) {
        Some(kind) => destination_validator(kind)(id, partial).map(Some),
        None => Ok(None),
    }
}

fn options(partial: Option<PartialOptions>) -> EntityOptions {
    let print_payload = partial
        .and_then(|options| options.debug)
        .and_then(|debug| debug.print_payload)
        .unwrap_or(false);
    EntityOptions {
        debug: DebugOptions { print_payload },
    }
}

fn require(
    value: Option<String>,
    field: &'static str,
    family: &'static str,
    id: &str,
) -> Result<String, ConfigError> {
    value.ok_or_else(|| ConfigError::MissingField {
        field,
        family,
        id: id.to_string(),
    })
}

fn github_webhook(id: &str, partial: PartialSource) -> Result<Source, ConfigError> {
    let config = partial.config.unwrap_or_default();
    Ok(Source {
        id: id.to_string(),
        enabled: partial.enabled.unwrap_or(false),
        notify_to: partial.notify_to.unwrap_or_default(),
        options: options(partial.options),
        config: SourceConfig::GithubWebhook(GithubWebhookConfig {
            webhook_secret: require(config.webhook_secret, "webhookSecret", "source", id)?,
        }),
    })
}

fn misskey(id: &str, partial: PartialDestination) -> Result<Destination, ConfigError> {
    let config = partial.config.unwrap_or_default();
    let url = require(config.url, "url", "destination", id)?;
    let token = require(config.token, "token", "destination", id)?;
    let default_post_visibility = match config.default_post_visibility.as_deref() {
        // An empty value counts as unset.
        None | Some("") => PostVisibility::default(),
        Some(raw) => raw
            .parse::<PostVisibility>()
            .map_err(|value| ConfigError::InvalidValue {
                field: "defaultPostVisibility",
                value,
                id: id.to_string(),
            })?,
    };

    Ok(Destination {
        id: id.to_string(),
        enabled: partial.enabled.unwrap_or(false),
        options: options(partial.options),
        config: DestinationConfig::Misskey(MisskeyConfig {
            url,
            token,
            default_post_visibility,
        }),
    })
}

fn discord(id: &str, partial: PartialDestination) -> Result<Destination, ConfigError> {
    let config = partial.config.unwrap_or_default();
    Ok(Destination {
        id: id.to_string(),
        enabled: partial.enabled.unwrap_or(false),
        options: options(partial.options),
        config: DestinationConfig::Discord(DiscordConfig {
            webhook_url: require(config.webhook_url, "webhookUrl", "destination", id)?,
            username: config.username,
            avatar_url: config.avatar_url,
        }),
    })
}
