//! Ports: the seams the application layer programs against. Concrete
//! adapters live in the infrastructure crate.

pub mod audit_sink;
pub mod event_bus;
pub mod exception_repository;
pub mod feedback_store;
pub mod llm_gateway;
pub mod metrics;
pub mod pack_repository;
pub mod tool_executor;

pub use audit_sink::{AuditEvent, AuditError, AuditSink};
pub use event_bus::{EventBus, EventBusError, IdempotencyError, IdempotencyStore, ProcessingStatus};
pub use exception_repository::{ExceptionRepository, RepositoryError};
pub use feedback_store::{FeedbackStore, ObservationCounts};
pub use llm_gateway::{GatewayError, GenerateRaw, GenerateResult, LlmGateway};
pub use metrics::{MetricsSink, NoopMetricsSink};
pub use pack_repository::PackRepository;
pub use tool_executor::{ToolExecutorPort, ToolInvocationError, ToolInvocationResult};
