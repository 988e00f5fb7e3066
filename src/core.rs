//! Core domain types and service traits for the notifier
//!
//! This module defines the validated configuration entities, the canonical
//! inbound payload, and the trait contract every outbound sender implements.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Payload
// =============================================================================

/// An inbound event, already translated from the upstream provider's format.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    /// Id of the source entity the event arrived through.
    pub source_id: String,
    /// Rendered text to deliver.
    pub content: String,
}

impl NotificationPayload {
    pub fn new(source_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            content: content.into(),
        }
    }
}

// =============================================================================
// Shared envelope
// =============================================================================

/// Options shared by every source and destination.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct EntityOptions {
    pub debug: DebugOptions,
}

/// Debugging switches.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct DebugOptions {
    /// Log the full payload verbatim before delivery.
    pub print_payload: bool,
}

// =============================================================================
// Sources
// =============================================================================

/// A validated inbound event origin.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    pub id: String,
    pub enabled: bool,
    /// Destination ids this source fans out to, in declaration order.
    pub notify_to: Vec<String>,
    pub options: EntityOptions,
    pub config: SourceConfig,
}

impl Source {
    pub fn kind(&self) -> SourceKind {
        match self.config {
            SourceConfig::GithubWebhook(_) => SourceKind::GithubWebhook,
        }
    }
}

/// Variant-specific source configuration.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum SourceConfig {
    GithubWebhook(GithubWebhookConfig),
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GithubWebhookConfig {
    /// Secret the ingestion layer uses to verify GitHub's signature header.
    pub webhook_secret: String,
}

/// The known source variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    GithubWebhook,
}

impl SourceKind {
    pub const ALL: &'static [SourceKind] = &[SourceKind::GithubWebhook];

    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::GithubWebhook => "github-webhook",
        }
    }

    /// Looks up a variant by its configuration tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.as_str() == tag)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Destinations
// =============================================================================

/// A validated outbound notification target.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Destination {
    pub id: String,
    pub enabled: bool,
    pub options: EntityOptions,
    pub config: DestinationConfig,
}

impl Destination {
    pub fn kind(&self) -> DestinationKind {
        match self.config {
            DestinationConfig::Misskey(_) => DestinationKind::Misskey,
            DestinationConfig::Discord(_) => DestinationKind::Discord,
        }
    }
}

/// Variant-specific destination configuration.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum DestinationConfig {
    Misskey(MisskeyConfig),
    Discord(DiscordConfig),
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MisskeyConfig {
    /// Base URL of the Misskey server, e.g. `https://misskey.example.com/`.
    pub url: String,
    /// Access token issued by an account on that server.
    pub token: String,
    pub default_post_visibility: PostVisibility,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DiscordConfig {
    pub webhook_url: String,
    /// Overrides the name set on the webhook in Discord.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Overrides the avatar set on the webhook in Discord.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// The known destination variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DestinationKind {
    Misskey,
    Discord,
}

impl DestinationKind {
    pub const ALL: &'static [DestinationKind] =
        &[DestinationKind::Misskey, DestinationKind::Discord];

    pub fn as_str(self) -> &'static str {
        match self {
            DestinationKind::Misskey => "misskey",
            DestinationKind::Discord => "discord",
        }
    }

    /// Looks up a variant by its configuration tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.as_str() == tag)
    }
}

impl fmt::Display for DestinationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Misskey note visibility.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PostVisibility {
    Public,
    #[default]
    Home,
    Followers,
    Specified,
}

impl PostVisibility {
    pub fn as_str(self) -> &'static str {
        match self {
            PostVisibility::Public => "public",
            PostVisibility::Home => "home",
            PostVisibility::Followers => "followers",
            PostVisibility::Specified => "specified",
        }
    }
}

impl FromStr for PostVisibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(PostVisibility::Public),
            "home" => Ok(PostVisibility::Home),
            "followers" => Ok(PostVisibility::Followers),
            "specified" => Ok(PostVisibility::Specified),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for PostVisibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Service Traits
// =============================================================================

/// Delivers payloads to a single outbound backend.
#[async_trait]
pub trait NotificationService: Send + Sync {
    /// The id of the destination this service was built for.
    fn id(&self) -> &str;

    /// Delivers a payload.
    ///
    /// Implementations report their own failures through logging; nothing is
    /// returned to the caller, so one destination can never abort delivery to
    /// another.
    async fn send(&self, payload: &NotificationPayload);
}
