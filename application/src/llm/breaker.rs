//! Circuit breaker state machine, per `(agent_name, tenant_id)`.
//!
//! State lives behind a `std::sync::Mutex` scoped to a single async turn
//! (never held across an `.await`) — the table is single-writer per
//! process; cross-process coordination is explicitly not
//! required, per the Design Notes.

use exception_platform_domain::circuit::{CircuitBreakerState, CircuitState};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
pub struct BreakerConfig {
    pub failure_threshold: u32,
    pub window: Duration,
    pub half_open_timeout: Duration,
    pub max_probes: u32,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            window: Duration::from_secs(60),
            half_open_timeout: Duration::from_secs(30),
            max_probes: 3,
        }
    }
}

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
struct BreakerKey {
    agent_name: String,
    tenant_id: Option<String>,
}

/// Per-`(agent, tenant)` breaker table.
pub struct CircuitBreakerRegistry {
    config: BreakerConfig,
    table: Mutex<HashMap<BreakerKey, CircuitBreakerState>>,
}

impl CircuitBreakerRegistry {
    pub fn new(config: BreakerConfig) -> Self {
        Self { config, table: Mutex::new(HashMap::new()) }
    }

    /// `CLOSED` → always true. `OPEN` → true (transitioning to `HALF_OPEN`,
    /// resetting probe count) iff elapsed since `opened_at` ≥
    /// `half_open_timeout`, else false. `HALF_OPEN` → true (incrementing
    /// probe count) iff `half_open_probe_count < max_probes`, else false.
    pub fn can_attempt(&self, agent_name: &str, tenant_id: Option<&str>) -> bool {
        let key = Self::key(agent_name, tenant_id);
        let mut table = self.table.lock().unwrap();
        let entry = table.entry(key).or_default();
        match entry.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let elapsed = entry.opened_at.map(|t| t.elapsed()).unwrap_or(Duration::MAX);
                if elapsed >= self.config.half_open_timeout {
                    entry.state = CircuitState::HalfOpen;
                    entry.half_open_probe_count = 0;
                    true
                } else {
                    false
                }
            }
            CircuitState::HalfOpen => {
                if entry.half_open_probe_count < self.config.max_probes {
                    entry.half_open_probe_count += 1;
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn record_success(&self, agent_name: &str, tenant_id: Option<&str>) {
        let key = Self::key(agent_name, tenant_id);
        let mut table = self.table.lock().unwrap();
        let entry = table.entry(key).or_default();
        match entry.state {
            CircuitState::HalfOpen => {
                entry.state = CircuitState::Closed;
                entry.failure_count = 0;
                entry.opened_at = None;
            }
            CircuitState::Closed => {
                entry.failure_count = 0;
            }
            CircuitState::Open => {}
        }
    }

    pub fn record_failure(&self, agent_name: &str, tenant_id: Option<&str>) {
        let key = Self::key(agent_name, tenant_id);
        let mut table = self.table.lock().unwrap();
        let entry = table.entry(key).or_default();
        let now = Instant::now();
        match entry.state {
            CircuitState::HalfOpen => {
                entry.state = CircuitState::Open;
                entry.opened_at = Some(now);
                entry.half_open_probe_count = 0;
                entry.last_failure_at = Some(now);
            }
            CircuitState::Closed => {
                let stale = entry
                    .last_failure_at
                    .map(|last| now.duration_since(last) > self.config.window)
                    .unwrap_or(false);
                entry.failure_count = if stale { 1 } else { entry.failure_count + 1 };
                entry.last_failure_at = Some(now);
                if entry.failure_count >= self.config.failure_threshold {
                    entry.state = CircuitState::Open;
                    entry.opened_at = Some(now);
                }
            }
            CircuitState::Open => {
                entry.last_failure_at = Some(now);
            }
        }
    }

    pub fn state(&self, agent_name: &str, tenant_id: Option<&str>) -> CircuitState {
        let key = Self::key(agent_name, tenant_id);
        self.table.lock().unwrap().entry(key).or_default().state
    }

    fn key(agent_name: &str, tenant_id: Option<&str>) -> BreakerKey {
        BreakerKey { agent_name: agent_name.to_string(), tenant_id: tenant_id.map(str::to_string) }
    }
}

impl Default for CircuitBreakerRegistry {
    fn default() -> Self {
        Self::new(BreakerConfig::default())
    }
}
