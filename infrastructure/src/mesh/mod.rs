//! Worker mesh: an in-memory topic broker, its companion
//! idempotency store, and a representative consumer —
//! [`PlaybookWorker`] — that drives a matched playbook's steps one event
//! at a time. A real deployment would swap [`InMemoryEventBus`] for a
//! broker client without the consumer logic changing.

mod event_bus;
mod idempotency;
mod playbook_worker;

pub use event_bus::InMemoryEventBus;
pub use idempotency::InMemoryIdempotencyStore;
pub use playbook_worker::PlaybookWorker;
