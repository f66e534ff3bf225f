//! Infrastructure layer for the exception-processing platform.
//!
//! Concrete adapters implementing the application layer's ports: the pack
//! registry, the LLM routing fabric's provider clients and cache, the tool
//! invoker, the audit sink, the worker mesh's event bus and idempotency
//! store, the exception repository, and the feedback store. Nothing here
//! is exposed to the application layer except through its `ports` traits.

pub mod audit;
pub mod config;
pub mod feedback;
pub mod llm;
pub mod mesh;
pub mod registry;
pub mod repository;
pub mod tools;

pub use audit::JsonlAuditSink;
pub use config::{AppConfig, ConfigLoader};
pub use feedback::InMemoryFeedbackStore;
pub use llm::{DummyProvider, OpenAiProvider, OpenRouterProvider, ProviderCache, TracingMetricsSink};
pub use mesh::{InMemoryEventBus, InMemoryIdempotencyStore, PlaybookWorker};
pub use registry::InMemoryPackRegistry;
pub use repository::InMemoryExceptionRepository;
pub use tools::DryRunToolExecutor;
