//! In-memory `EventBus`: one `tokio::sync::mpsc` channel per subscriber,
//! fanned out per topic — each subscribed consumer group gets its own
//! copy of every event published to a topic it subscribes to.

use async_trait::async_trait;
use exception_platform_application::ports::{EventBus, EventBusError};
use exception_platform_domain::CanonicalEvent;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::mpsc;

#[derive(Default)]
pub struct InMemoryEventBus {
    subscribers: Mutex<HashMap<String, Vec<mpsc::UnboundedSender<CanonicalEvent>>>>,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new consumer for `topic`, returning the receiver half
    /// it should poll. Each call creates an independent channel, so N
    /// subscribers to the same topic each see every event published to
    /// it (fan-out, not load-balancing).
    pub fn subscribe(&self, topic: &str) -> mpsc::UnboundedReceiver<CanonicalEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().unwrap().entry(topic.to_string()).or_default().push(tx);
        rx
    }
}

#[async_trait]
impl EventBus for InMemoryEventBus {
    async fn publish(&self, topic: &str, event: CanonicalEvent) -> Result<(), EventBusError> {
        let mut subscribers = self.subscribers.lock().unwrap();
        let Some(senders) = subscribers.get_mut(topic) else {
            return Ok(());
        };
        senders.retain(|tx| tx.send(event.clone()).is_ok());
        Ok(())
    }
}
