//! The dispatch registry.
//!
//! [`Notifier`] holds one live service per enabled destination and fans each
//! payload out to the destinations its source names. It is built once at
//! startup and only read afterwards.

use crate::config::Config;
use crate::core::{Destination, DestinationKind, NotificationPayload, NotificationService};
use crate::notification::{DiscordNotificationService, MisskeyNotificationService};
use futures::future::join_all;
use futures::FutureExt;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Builds the live service for one destination.
pub type ServiceFactory =
    Arc<dyn Fn(&Destination) -> anyhow::Result<Arc<dyn NotificationService>> + Send + Sync>;

/// Builder for the [`Notifier`].
///
/// Services are created through a factory registered per destination type,
/// which lets tests swap in fakes without touching the routing logic.
pub struct NotifierBuilder {
    config: Arc<Config>,
    factories: HashMap<DestinationKind, ServiceFactory>,
}

impl NotifierBuilder {
    /// Creates a builder with no registered factories.
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            config,
            factories: HashMap::new(),
        }
    }

    /// Registers (or replaces) the factory for a destination type.
    pub fn register<F>(mut self, kind: DestinationKind, factory: F) -> Self
    where
        F: Fn(&Destination) -> anyhow::Result<Arc<dyn NotificationService>> + Send + Sync + 'static,
    {
        self.factories.insert(kind, Arc::new(factory));
        self
    }

    /// Registers the HTTP-backed Misskey and Discord services.
    pub fn with_default_services(self, client: reqwest::Client) -> Self {
        let discord_client = client.clone();
        self.register(DestinationKind::Misskey, move |destination| {
            Ok(Arc::new(MisskeyNotificationService::new(destination, client.clone())?)
                as Arc<dyn NotificationService>)
        })
        .register(DestinationKind::Discord, move |destination| {
            Ok(Arc::new(DiscordNotificationService::new(destination, discord_client.clone())?)
                as Arc<dyn NotificationService>)
        })
    }

    /// Instantiates a service for every enabled destination.
    ///
    /// A destination whose type has no factory, or whose factory fails, is
    /// logged and left out. It never fails the whole registry.
    pub fn build(self) -> Notifier {
        let mut services: HashMap<String, Arc<dyn NotificationService>> = HashMap::new();

        for destination in self.config.destinations().values().filter(|d| d.enabled) {
            let kind = destination.kind();
            let Some(factory) = self.factories.get(&kind) else {
                warn!(
                    destination = %destination.id,
                    kind = %kind,
                    "No notification service registered for destination type"
                );
                continue;
            };

            match factory(destination) {
                Ok(service) => {
                    info!(destination = %destination.id, "Initialized notification service");
                    services.insert(destination.id.clone(), service);
                }
                Err(e) => {
                    warn!(
                        destination = %destination.id,
                        error = %e,
                        "Failed to initialize notification service"
                    );
                }
            }
        }

        info!("Initialized {} notification services", services.len());
        Notifier {
            config: self.config,
            services,
        }
    }
}

/// Routes payloads from a source to its live destination services.
pub struct Notifier {
    config: Arc<Config>,
    services: HashMap<String, Arc<dyn NotificationService>>,
}

impl Notifier {
    pub fn builder(config: Arc<Config>) -> NotifierBuilder {
        NotifierBuilder::new(config)
    }

    /// Creates a registry backed by the HTTP services for every known type.
    pub fn new(config: Arc<Config>, client: reqwest::Client) -> Self {
        NotifierBuilder::new(config)
            .with_default_services(client)
            .build()
    }

    /// The number of live services.
    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Whether a live service exists for the destination id.
    pub fn contains(&self, destination_id: &str) -> bool {
        self.services.contains_key(destination_id)
    }

    /// Delivers a payload to every live destination of its source.
    ///
    /// Unknown sources are logged and ignored. Destinations without a live
    /// service are skipped. Deliveries run concurrently and this returns once
    /// all of them have settled, whatever their outcome.
    #[instrument(skip_all, fields(source = %payload.source_id))]
    pub async fn send(&self, payload: &NotificationPayload) {
        let Some(source) = self.config.source(&payload.source_id) else {
            warn!("Unknown source ID: {}", payload.source_id);
            return;
        };

        info!(notify_to = ?source.notify_to, "Sending notification");

        let deliveries = source
            .notify_to
            .iter()
            .filter_map(|id| self.services.get(id))
            .map(|service| {
                AssertUnwindSafe(service.send(payload))
                    .catch_unwind()
                    .map(move |outcome| {
                        if outcome.is_err() {
                            error!(destination = %service.id(), "Notification service panicked");
                        }
                    })
            });

        join_all(deliveries).await;
    }
}
