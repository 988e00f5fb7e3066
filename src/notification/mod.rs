//! Outbound notification services and the dispatch registry.
//!
//! Each enabled destination gets one [`NotificationService`] built by the
//! [`manager::Notifier`]. Services own their failures: an HTTP error is
//! logged where it happens and never reaches the registry.
//!
//! [`NotificationService`]: crate::core::NotificationService

pub mod discord;
pub mod manager;
pub mod misskey;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

use reqwest::{RequestBuilder, StatusCode};
use serde::Serialize;
use thiserror::Error;

pub use discord::DiscordNotificationService;
pub use manager::{Notifier, NotifierBuilder};
pub use misskey::MisskeyNotificationService;

#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("unexpected response: {status} - {body}")]
    Status { status: StatusCode, body: String },

    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Sends `body` as JSON and treats any non-2xx status as an error.
async fn post_json<T: Serialize + ?Sized>(
    request: RequestBuilder,
    body: &T,
) -> Result<(), DeliveryError> {
    let response = request.json(body).send().await?;
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().await.unwrap_or_default();
    Err(DeliveryError::Status { status, body })
}
