//! A client for sending notifications to a Discord webhook.

use crate::core::{
    Destination, DestinationConfig, DiscordConfig, EntityOptions, NotificationPayload,
    NotificationService,
};
use crate::notification::{post_json, DeliveryError};
use async_trait::async_trait;
use serde::Serialize;
use tracing::{error, info, instrument};

/// Discord's execute-webhook body. Unset overrides are left out entirely.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct DiscordMessage<'a> {
    pub content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<&'a str>,
}

/// Posts each payload to a Discord channel webhook.
pub struct DiscordNotificationService {
    id: String,
    config: DiscordConfig,
    options: EntityOptions,
    client: reqwest::Client,
}

impl DiscordNotificationService {
    /// Creates a service for a Discord destination.
    pub fn new(destination: &Destination, client: reqwest::Client) -> anyhow::Result<Self> {
        let DestinationConfig::Discord(config) = &destination.config else {
            anyhow::bail!("destination {} is not a discord destination", destination.id);
        };
        Ok(Self {
            id: destination.id.clone(),
            config: config.clone(),
            options: destination.options.clone(),
            client,
        })
    }

    pub fn request_body<'a>(&'a self, payload: &'a NotificationPayload) -> DiscordMessage<'a> {
        let non_empty = |value: &'a Option<String>| value.as_deref().filter(|v| !v.is_empty());
        DiscordMessage {
            content: &payload.content,
            username: non_empty(&self.config.username),
            avatar_url: non_empty(&self.config.avatar_url),
        }
    }

    /// Performs the webhook call, returning any failure to the caller.
    pub async fn deliver(&self, payload: &NotificationPayload) -> Result<(), DeliveryError> {
        let request = self.client.post(&self.config.webhook_url);
        post_json(request, &self.request_body(payload)).await
    }
}

#[async_trait]
impl NotificationService for DiscordNotificationService {
    fn id(&self) -> &str {
        &self.id
    }

    #[instrument(skip(self, payload), fields(destination = %self.id))]
    async fn send(&self, payload: &NotificationPayload) {
        if self.options.debug.print_payload {
            info!(
                payload = %serde_json::to_string(payload).unwrap_or_default(),
                "Discord payload"
            );
        }

        match self.deliver(payload).await {
            Ok(()) => info!("Sent message to Discord."),
            Err(DeliveryError::Status { status, body }) => {
                error!(status = %status, body = %body, "Discord webhook error");
            }
            Err(e) => error!(error = %e, "Error sending Discord notification"),
        }
    }
}
