//! Retry/backoff + circuit breaker integration and rule-based fallback
//!. `call_with_fallback` wraps a single provider;
//! `call_with_fallback_chain` walks an ordered list of providers;
//! `llm_or_rules` is the per-agent facade stages call into.

use super::breaker::CircuitBreakerRegistry;
use super::schema::{self, SchemaName, ValidationError};
use crate::ports::{AuditEvent, AuditSink, GatewayError, LlmGateway};
use exception_platform_domain::DynValue;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub per_attempt_timeout: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            per_attempt_timeout: Duration::from_secs(30),
        }
    }
}

/// `delay(attempt) = min(base * 2^attempt, max_delay)`, applied before
/// retry attempts after the first (no delay before attempt 0).
pub fn backoff_delay(config: &RetryConfig, attempt: u32) -> Duration {
    let scaled = config.base_delay.saturating_mul(1u32.checked_shl(attempt).unwrap_or(u32::MAX));
    scaled.min(config.max_delay)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    Timeout,
    ValidationError,
    ProviderError,
    CircuitOpen,
    MaxRetriesExceeded,
}

impl FallbackReason {
    fn as_str(&self) -> &'static str {
        match self {
            FallbackReason::Timeout => "Timeout",
            FallbackReason::ValidationError => "ValidationError",
            FallbackReason::ProviderError => "ProviderError",
            FallbackReason::CircuitOpen => "CircuitOpen",
            FallbackReason::MaxRetriesExceeded => "MaxRetriesExceeded",
        }
    }
}

/// Outcome of `call_with_fallback`: either a validated LLM result, or a
/// rule-based result tagged with fallback metadata.
pub struct LlmOrRulesOutcome {
    pub value: DynValue,
    pub used_fallback: bool,
    pub fallback_reason: Option<FallbackReason>,
}

/// Single-provider call with retry/backoff/timeout and breaker
/// integration. On exhaustion, falls back to `rule_based`.
#[allow(clippy::too_many_arguments)]
pub async fn call_with_fallback(
    agent_name: &str,
    tenant_id: Option<&str>,
    domain: Option<&str>,
    client: &dyn LlmGateway,
    breaker: &CircuitBreakerRegistry,
    schema_name: SchemaName,
    prompt: &str,
    context: &DynValue,
    retry: &RetryConfig,
    audit: &dyn AuditSink,
    rule_based: impl Fn() -> DynValue,
) -> LlmOrRulesOutcome {
    if !breaker.can_attempt(agent_name, tenant_id) {
        return fall_back(agent_name, tenant_id, FallbackReason::CircuitOpen, audit, rule_based).await;
    }

    let sanitized_prompt = exception_platform_domain::sanitize_prompt(domain, prompt, context);

    let mut last_reason = FallbackReason::ProviderError;
    for attempt in 0..retry.max_retries {
        if attempt > 0 {
            tokio::time::sleep(backoff_delay(retry, attempt)).await;
        }

        let call = client.generate(&sanitized_prompt, context, schema_name.as_str());
        let outcome = tokio::time::timeout(retry.per_attempt_timeout, call).await;

        match outcome {
            Err(_elapsed) => {
                last_reason = FallbackReason::Timeout;
                breaker.record_failure(agent_name, tenant_id);
            }
            Ok(Err(GatewayError::Timeout)) => {
                last_reason = FallbackReason::Timeout;
                breaker.record_failure(agent_name, tenant_id);
            }
            Ok(Err(GatewayError::ProviderError(_))) => {
                last_reason = FallbackReason::ProviderError;
                breaker.record_failure(agent_name, tenant_id);
            }
            Ok(Err(GatewayError::ValidationFailed(_))) => {
                last_reason = FallbackReason::ValidationError;
                breaker.record_failure(agent_name, tenant_id);
            }
            Ok(Ok(result)) => match schema::validate_and_sanitize(schema_name, &result.text) {
                Ok(value) => {
                    breaker.record_success(agent_name, tenant_id);
                    return LlmOrRulesOutcome { value, used_fallback: false, fallback_reason: None };
                }
                Err(ValidationError::NotJson) | Err(ValidationError::MissingField(_)) | Err(ValidationError::WrongType { .. }) => {
                    last_reason = FallbackReason::ValidationError;
                    breaker.record_failure(agent_name, tenant_id);
                }
            },
        }
    }

    let reason = if retry.max_retries == 1 { last_reason } else { FallbackReason::MaxRetriesExceeded };
    fall_back(agent_name, tenant_id, reason, audit, rule_based).await
}

async fn fall_back(
    agent_name: &str,
    tenant_id: Option<&str>,
    reason: FallbackReason,
    audit: &dyn AuditSink,
    rule_based: impl Fn() -> DynValue,
) -> LlmOrRulesOutcome {
    let mut value = rule_based();
    if let DynValue::Object(ref mut map) = value {
        map.insert("llm_fallback".into(), DynValue::Bool(true));
        map.insert("fallback_reason".into(), DynValue::String(reason.as_str().into()));
        map.insert("fallback_path".into(), DynValue::String("rule_based".into()));
    }

    let mut data = DynValue::object();
    data.set("agent_name", DynValue::String(agent_name.into()));
    data.set("reason", DynValue::String(reason.as_str().into()));
    data.set("path", DynValue::String("rule_based".into()));
    if let Some(t) = tenant_id {
        data.set("tenant_id", DynValue::String(t.into()));
    }
    let _ = audit
        .record(AuditEvent::new("llm_fallback", chrono::Utc::now(), data))
        .await;

    LlmOrRulesOutcome { value, used_fallback: true, fallback_reason: Some(reason) }
}

/// One attempt against one provider in a fallback chain.
pub struct ChainAttempt {
    pub provider: String,
    pub outcome: &'static str,
}

pub struct ChainResult {
    pub value: DynValue,
    pub provider_used: String,
    pub provider_index: Option<usize>,
    pub total_providers_attempted: usize,
    pub attempts: Vec<ChainAttempt>,
    pub fallback_chain_exhausted: bool,
}

const APOLOGY_TEXT: &str =
    "I apologize, but I'm unable to process this request right now. Please try again later.";

/// Iterates providers in fallback-chain order, attempting `generate` once
/// per provider (no retries at this layer — that's `call_with_fallback`'s
/// job for a single provider). Never raises across the chain boundary
///: on total exhaustion, returns a
/// terminal dummy-like apology response.
pub async fn call_with_fallback_chain(
    clients: &[(&str, &dyn LlmGateway)],
    schema_name: SchemaName,
    prompt: &str,
    context: &DynValue,
) -> ChainResult {
    let mut attempts = Vec::new();

    for (index, (name, client)) in clients.iter().enumerate() {
        match client.generate(prompt, context, schema_name.as_str()).await {
            Ok(result) => {
                attempts.push(ChainAttempt { provider: (*name).to_string(), outcome: "success" });
                let mut value = DynValue::object();
                value.set("text", DynValue::String(result.text));
                return ChainResult {
                    value,
                    provider_used: (*name).to_string(),
                    provider_index: Some(index),
                    total_providers_attempted: attempts.len(),
                    attempts,
                    fallback_chain_exhausted: false,
                };
            }
            Err(_) => {
                attempts.push(ChainAttempt { provider: (*name).to_string(), outcome: "failure" });
            }
        }
    }

    let mut value = DynValue::object();
    value.set("text", DynValue::String(APOLOGY_TEXT.into()));
    ChainResult {
        value,
        provider_used: "dummy".to_string(),
        provider_index: None,
        total_providers_attempted: attempts.len(),
        attempts,
        fallback_chain_exhausted: true,
    }
}
