//! NATS-backed publisher for configurator events.
//!
//! Publishing is best effort: without a connection events are dropped, and a
//! failed publish is logged but never fails the request that caused it.

use crate::domain::events::ConfiguratorEvent;

#[derive(Clone, Default)]
pub struct EventPublisher {
    client: Option<async_nats::Client>,
}

impl EventPublisher {
    pub fn new(client: Option<async_nats::Client>) -> Self {
        Self { client }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.client.is_some()
    }

    pub async fn publish(&self, event: &ConfiguratorEvent) {
        let Some(client) = &self.client else {
            tracing::trace!(subject = event.subject(), "no NATS connection, dropping event");
            return;
        };
        let payload = match serde_json::to_vec(event) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(subject = event.subject(), error = %e, "could not encode event");
                return;
            }
        };
        if let Err(e) = client.publish(event.subject().to_string(), payload.into()).await {
            tracing::warn!(subject = event.subject(), error = %e, "event publish failed");
        }
    }
}
