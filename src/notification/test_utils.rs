use crate::core::{NotificationPayload, NotificationService};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, PoisonError};

/// Shared record of every delivery made by [`RecordingService`]s.
#[derive(Clone, Debug, Default)]
pub struct DeliveryLog {
    entries: Arc<Mutex<Vec<(String, NotificationPayload)>>>,
}

impl DeliveryLog {
    /// Every `(destination id, payload)` pair received so far, in arrival order.
    pub fn entries(&self) -> Vec<(String, NotificationPayload)> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The destination ids that received a delivery, in arrival order.
    pub fn destination_ids(&self) -> Vec<String> {
        self.entries().into_iter().map(|(id, _)| id).collect()
    }

    fn record(&self, id: &str, payload: &NotificationPayload) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id.to_string(), payload.clone()));
    }
}

/// Fake notification service for testing
pub struct RecordingService {
    id: String,
    log: DeliveryLog,
    panic_after_record: bool,
}

impl RecordingService {
    pub fn new(id: &str, log: DeliveryLog) -> Self {
        Self {
            id: id.to_string(),
            log,
            panic_after_record: false,
        }
    }

    /// A service that records the delivery and then panics.
    pub fn panicking(id: &str, log: DeliveryLog) -> Self {
        Self {
            panic_after_record: true,
            ..Self::new(id, log)
        }
    }
}

#[async_trait]
impl NotificationService for RecordingService {
    fn id(&self) -> &str {
        &self.id
    }

    async fn send(&self, payload: &NotificationPayload) {
        // Yield once so sibling deliveries genuinely interleave.
        tokio::task::yield_now().await;
        self.log.record(&self.id, payload);
        if self.panic_after_record {
            panic!("RecordingService {} configured to panic", self.id);
        }
    }
}
