//! The LLM routing fabric's agent-facing half: schema
//! validation, circuit breaking, and retry/fallback. Provider selection
//! lives in [`exception_platform_domain::routing`]; concrete
//! provider adapters live in the infrastructure crate behind the
//! [`crate::ports::LlmGateway`] port.

pub mod breaker;
pub mod fallback;
pub mod schema;

pub use breaker::{BreakerConfig, CircuitBreakerRegistry};
pub use fallback::{
    backoff_delay, call_with_fallback, call_with_fallback_chain, ChainAttempt, ChainResult,
    FallbackReason, LlmOrRulesOutcome, RetryConfig,
};
pub use schema::{parse_llm_json, sanitize, validate, validate_and_sanitize, SchemaName, ValidationError};
