//! Transport port for the canonical event envelope.

use async_trait::async_trait;
use exception_platform_domain::CanonicalEvent;

#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("publish failed: {0}")]
    PublishFailed(String),
}

/// A topic publisher. The concrete in-memory implementation in
/// `infrastructure::mesh` fans events out to any subscribed consumer
/// groups; a real deployment would swap this for a broker client.
#[async_trait]
pub trait EventBus: Send + Sync {
    async fn publish(&self, topic: &str, event: CanonicalEvent) -> Result<(), EventBusError>;
}

/// Idempotency/ack status for one `(event_id, consumer_group)` pair
///.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStatus {
    Processing,
    Completed,
    Failed,
}

#[derive(Debug, thiserror::Error)]
pub enum IdempotencyError {
    /// Treated as success by callers: "Conflict in idempotency
    /// check is treated as success (the event is already processed)."
    #[error("already processed")]
    Conflict,
}

/// Tracks `(event_id, consumer_group)` so replayed deliveries are a no-op
///.
pub trait IdempotencyStore: Send + Sync {
    /// Returns `Err(Conflict)` if this pair is already `Completed` or
    /// currently `Processing`; otherwise marks it `Processing` and returns
    /// `Ok(())`.
    fn begin(&self, event_id: &str, consumer_group: &str) -> Result<(), IdempotencyError>;
    fn complete(&self, event_id: &str, consumer_group: &str);
    fn fail(&self, event_id: &str, consumer_group: &str, error: &str);
    fn status(&self, event_id: &str, consumer_group: &str) -> Option<ProcessingStatus>;
}
