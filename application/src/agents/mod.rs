//! Agent stages: Triage, Policy, Resolution, Supervisor,
//! Feedback. Every stage runs a rule-based computation first, then — if an
//! LLM client is configured — merges a schema-validated LLM opinion under a
//! stage-specific precedence rule, flattens the reasoning into evidence,
//! and writes an audit event.
//!
//! The "LLM disagreement decreases confidence" rule left unpinned by the
//! source lineage (no exact multiplier recorded) is fixed here at a flat
//! [`DISAGREEMENT_PENALTY`] applied once per disagreement dimension —
//! resolved and recorded in DESIGN.md.

pub mod feedback;
pub mod policy;
pub mod resolution;
pub mod supervisor;
pub mod triage;

use crate::llm::{CircuitBreakerRegistry, RetryConfig};
use crate::ports::{AuditEvent, AuditSink, LlmGateway};
use exception_platform_domain::{AgentDecision, ExceptionRecord};

/// Confidence multiplier applied once per disagreement dimension between
/// the rule-based result and the LLM's opinion (see DESIGN.md).
pub const DISAGREEMENT_PENALTY: f64 = 0.5;

/// Collaborators every stage needs: an optional LLM client (absent means
/// rule-based-only operation), the shared breaker table, retry policy, and
/// the audit sink.
pub struct StageDeps<'a> {
    pub llm: Option<&'a dyn LlmGateway>,
    pub breaker: &'a CircuitBreakerRegistry,
    pub retry: RetryConfig,
    pub audit: &'a dyn AuditSink,
}

/// Writes the per-stage audit event carrying the flattened decision.
/// Every stage calls this once, after merging.
pub async fn emit_stage_audit(audit: &dyn AuditSink, stage: &str, exception: &ExceptionRecord, decision: &AgentDecision) {
    let mut data = exception_platform_domain::DynValue::object();
    data.set("stage", exception_platform_domain::DynValue::String(stage.into()));
    data.set("decision", exception_platform_domain::DynValue::String(decision.decision.clone()));
    data.set("confidence", exception_platform_domain::DynValue::Number(decision.confidence));
    data.set(
        "evidence",
        exception_platform_domain::DynValue::Array(
            decision.evidence.iter().map(|e| exception_platform_domain::DynValue::String(e.clone())).collect(),
        ),
    );

    let event_type = format!("{stage}_completed");
    let event = AuditEvent::new(event_type, chrono::Utc::now(), data)
        .for_exception(exception.tenant_id.clone(), exception.exception_id.clone());
    let _ = audit.record(event).await;
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::ports::{AuditError, AuditEvent, AuditSink};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct RecordingAuditSink {
        pub events: Mutex<Vec<AuditEvent>>,
    }

    #[async_trait]
    impl AuditSink for RecordingAuditSink {
        async fn record(&self, event: AuditEvent) -> Result<(), AuditError> {
            self.events.lock().unwrap().push(event);
            Ok(())
        }
    }
}
