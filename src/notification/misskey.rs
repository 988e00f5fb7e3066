//! A client for posting notes to a Misskey server.

use crate::core::{
    Destination, DestinationConfig, EntityOptions, MisskeyConfig, NotificationPayload,
    NotificationService, PostVisibility,
};
use crate::notification::{post_json, DeliveryError};
use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use serde::Serialize;
use tracing::{error, info, instrument};

/// User agent sent with every Misskey API call.
pub const MISSKEY_USER_AGENT: &str = "yamisskey-github-notifier/1.0";

/// Request body for `POST api/notes/create`.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct CreateNote<'a> {
    /// Access token.
    pub i: &'a str,
    pub text: &'a str,
    pub visibility: PostVisibility,
}

/// Posts each payload as a note on the configured Misskey account.
pub struct MisskeyNotificationService {
    id: String,
    config: MisskeyConfig,
    options: EntityOptions,
    client: reqwest::Client,
}

impl MisskeyNotificationService {
    /// Creates a service for a Misskey destination.
    pub fn new(destination: &Destination, client: reqwest::Client) -> anyhow::Result<Self> {
        let DestinationConfig::Misskey(config) = &destination.config else {
            anyhow::bail!("destination {} is not a misskey destination", destination.id);
        };
        Ok(Self {
            id: destination.id.clone(),
            config: config.clone(),
            options: destination.options.clone(),
            client,
        })
    }

    /// The note creation endpoint, with the base URL normalized to end in `/`.
    pub fn endpoint(&self) -> String {
        let base = &self.config.url;
        if base.ends_with('/') {
            format!("{}api/notes/create", base)
        } else {
            format!("{}/api/notes/create", base)
        }
    }

    pub fn request_body<'a>(&'a self, payload: &'a NotificationPayload) -> CreateNote<'a> {
        CreateNote {
            i: &self.config.token,
            text: &payload.content,
            visibility: self.config.default_post_visibility,
        }
    }

    /// Performs the API call, returning any failure to the caller.
    pub async fn deliver(&self, payload: &NotificationPayload) -> Result<(), DeliveryError> {
        let request = self
            .client
            .post(self.endpoint())
            .header(USER_AGENT, MISSKEY_USER_AGENT);
        post_json(request, &self.request_body(payload)).await
    }
}

#[async_trait]
impl NotificationService for MisskeyNotificationService {
    fn id(&self) -> &str {
        &self.id
    }

    #[instrument(skip(self, payload), fields(destination = %self.id))]
    async fn send(&self, payload: &NotificationPayload) {
        if self.options.debug.print_payload {
            info!(
                payload = %serde_json::to_string(payload).unwrap_or_default(),
                "Misskey payload"
            );
        }

        match self.deliver(payload).await {
            Ok(()) => info!("Posted note to Misskey."),
            Err(DeliveryError::Status { status, body }) => {
                error!(status = %status, body = %body, "Misskey API error");
            }
            Err(e) => error!(error = %e, "Error sending Misskey notification"),
        }
    }
}
