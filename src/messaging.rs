//! Domain-event fan-out over NATS.

use crate::domain::events::DomainEvent;

/// Publishes domain events when a NATS connection is configured; otherwise a no-op.
#[derive(Clone, Default)]
pub struct EventPublisher {
    nats: Option<async_nats::Client>,
}

impl EventPublisher {
    pub fn disabled() -> Self { Self::default() }

    /// Connects to `url`. A failed connection degrades to a disabled publisher.
    pub async fn connect(url: Option<&str>) -> Self {
        let Some(url) = url else { return Self::disabled() };
        match async_nats::connect(url).await {
            Ok(client) => {
                tracing::info!(%url, "publishing domain events to NATS");
                Self { nats: Some(client) }
            }
            Err(error) => {
                tracing::warn!(%url, %error, "NATS unavailable, domain events will not be published");
                Self::disabled()
            }
        }
    }

    pub fn is_enabled(&self) -> bool { self.nats.is_some() }

    /// Never fails the caller; publish errors are logged.
    pub async fn publish(&self, events: Vec<DomainEvent>) {
        let Some(client) = &self.nats else { return };
        for event in events {
            let payload = match serde_json::to_vec(&event) {
                Ok(p) => p,
                Err(error) => {
                    tracing::warn!(%error, subject = event.subject(), "could not encode domain event");
                    continue;
                }
            };
            if let Err(error) = client.publish(event.subject().to_string(), payload.into()).await {
                tracing::warn!(%error, subject = event.subject(), "failed to publish domain event");
            }
        }
    }
}
