//! In-memory `(event_id, consumer_group)` idempotency table: a replayed
//! delivery to the same consumer group is a no-op rather than a re-run.

use exception_platform_application::ports::{IdempotencyError, IdempotencyStore, ProcessingStatus};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
pub struct InMemoryIdempotencyStore {
    table: Mutex<HashMap<(String, String), ProcessingStatus>>,
}

impl InMemoryIdempotencyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdempotencyStore for InMemoryIdempotencyStore {
    fn begin(&self, event_id: &str, consumer_group: &str) -> Result<(), IdempotencyError> {
        let mut table = self.table.lock().unwrap();
        let key = (event_id.to_string(), consumer_group.to_string());
        match table.get(&key) {
            Some(ProcessingStatus::Completed) | Some(ProcessingStatus::Processing) => Err(IdempotencyError::Conflict),
            _ => {
                table.insert(key, ProcessingStatus::Processing);
                Ok(())
            }
        }
    }

    fn complete(&self, event_id: &str, consumer_group: &str) {
        self.table
            .lock()
            .unwrap()
            .insert((event_id.to_string(), consumer_group.to_string()), ProcessingStatus::Completed);
    }

    fn fail(&self, event_id: &str, consumer_group: &str, error: &str) {
        tracing::warn!(event_id, consumer_group, error, "worker mesh consumer failed");
        self.table
            .lock()
            .unwrap()
            .insert((event_id.to_string(), consumer_group.to_string()), ProcessingStatus::Failed);
    }

    fn status(&self, event_id: &str, consumer_group: &str) -> Option<ProcessingStatus> {
        self.table.lock().unwrap().get(&(event_id.to_string(), consumer_group.to_string())).copied()
    }
}
