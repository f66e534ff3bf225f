//! Circuit breaker state shape shared between domain and application
//!. The state machine transitions themselves live in
//! `application::llm::breaker`, which owns the mutable table; this module
//! only defines the value type so callers can reason about breaker state
//! without depending on that table directly.

use serde::{Deserialize, Serialize};
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerState {
    pub state: CircuitState,
    pub failure_count: u32,
    pub last_failure_at: Option<Instant>,
    pub opened_at: Option<Instant>,
    pub half_open_probe_count: u32,
}

impl Default for CircuitBreakerState {
    fn default() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            last_failure_at: None,
            opened_at: None,
            half_open_probe_count: 0,
        }
    }
}
