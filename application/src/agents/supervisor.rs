//! Supervisor checkpoint: invoked after Policy and again after
//! Resolution, not a pipeline node in its own right. Reviews the decisions
//! made so far against guardrails and can tighten — never loosen — the
//! flow.
//!
//! The escalation confidence floor is not pinned by the source lineage; it
//! is fixed here at [`ESCALATION_CONFIDENCE_FLOOR`] (resolved Open
//! Question, see DESIGN.md).

use super::{emit_stage_audit, StageDeps};
use crate::llm::{call_with_fallback, SchemaName};
use exception_platform_domain::{AgentDecision, DynValue, ExceptionRecord, Guardrails, Severity};

/// Below this confidence, the Supervisor escalates regardless of guardrail
/// thresholds — a hard floor beneath the tenant-configurable
/// `human_approval_threshold`.
pub const ESCALATION_CONFIDENCE_FLOOR: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorVerdict {
    ApprovedFlow,
    Intervened,
    Escalated,
}

impl SupervisorVerdict {
    fn as_str(&self) -> &'static str {
        match self {
            SupervisorVerdict::ApprovedFlow => "APPROVED_FLOW",
            SupervisorVerdict::Intervened => "INTERVENED",
            SupervisorVerdict::Escalated => "ESCALATED",
        }
    }

    fn next_step(&self) -> &'static str {
        match self {
            SupervisorVerdict::ApprovedFlow => "Continue",
            SupervisorVerdict::Intervened => "PendingApproval",
            SupervisorVerdict::Escalated => "Escalate",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            SupervisorVerdict::Escalated => 0,
            SupervisorVerdict::Intervened => 1,
            SupervisorVerdict::ApprovedFlow => 2,
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_uppercase().as_str() {
            "APPROVED_FLOW" => Some(SupervisorVerdict::ApprovedFlow),
            "INTERVENED" => Some(SupervisorVerdict::Intervened),
            "ESCALATED" => Some(SupervisorVerdict::Escalated),
            _ => None,
        }
    }

    fn from_rank(rank: u8) -> Self {
        match rank {
            0 => SupervisorVerdict::Escalated,
            1 => SupervisorVerdict::Intervened,
            _ => SupervisorVerdict::ApprovedFlow,
        }
    }
}

pub struct SupervisorInput<'a> {
    pub exception: &'a ExceptionRecord,
    pub checkpoint: &'a str,
    pub severity: Severity,
    pub confidence: f64,
    pub prior_decisions_summary: &'a str,
    pub guardrails: &'a Guardrails,
    pub domain: &'a str,
}

pub struct SupervisorOutcome {
    pub decision: AgentDecision,
    pub verdict: SupervisorVerdict,
}

fn rule_based(input: &SupervisorInput<'_>) -> SupervisorVerdict {
    if input.severity == Severity::Critical || input.confidence < ESCALATION_CONFIDENCE_FLOOR {
        SupervisorVerdict::Escalated
    } else if input.confidence < input.guardrails.human_approval_threshold {
        SupervisorVerdict::Intervened
    } else {
        SupervisorVerdict::ApprovedFlow
    }
}

/// Most-restrictive-of-(rule, llm) wins; since rule-based `ESCALATED` has
/// rank 0 this already guarantees an LLM `APPROVED_FLOW` can never
/// override a rule-based escalation.
fn merge_verdict(rule: SupervisorVerdict, llm: Option<SupervisorVerdict>) -> SupervisorVerdict {
    match llm {
        None => rule,
        Some(llm) => SupervisorVerdict::from_rank(rule.rank().min(llm.rank())),
    }
}

pub async fn process(input: SupervisorInput<'_>, deps: &StageDeps<'_>) -> SupervisorOutcome {
    let rule_verdict = rule_based(&input);
    let mut evidence = vec![format!(
        "rule-based checkpoint '{}': {} (severity={:?} confidence={:.2})",
        input.checkpoint,
        rule_verdict.as_str(),
        input.severity,
        input.confidence
    )];

    let (verdict, confidence) = match deps.llm {
        None => (rule_verdict, input.confidence),
        Some(client) => {
            let mut context = DynValue::object();
            context.set("checkpoint", DynValue::String(input.checkpoint.to_string()));
            context.set("prior_decisions", DynValue::String(input.prior_decisions_summary.to_string()));
            context.set("rule_verdict", DynValue::String(rule_verdict.as_str().to_string()));

            let prompt = format!(
                "At checkpoint '{}', review: {}. Rule-based verdict: {}. Decide APPROVED_FLOW/INTERVENED/ESCALATED.",
                input.checkpoint,
                input.prior_decisions_summary,
                rule_verdict.as_str()
            );

            let outcome = call_with_fallback(
                "supervisor",
                Some(input.exception.tenant_id.as_str()),
                Some(input.domain),
                client,
                deps.breaker,
                SchemaName::Supervisor,
                &prompt,
                &context,
                &deps.retry,
                deps.audit,
                || {
                    let mut v = DynValue::object();
                    v.set("decision", DynValue::String(rule_verdict.as_str().to_string()));
                    v.set("confidence", DynValue::Number(input.confidence));
                    v
                },
            )
            .await;

            let llm_verdict = outcome.value.get("decision").and_then(DynValue::as_str).and_then(SupervisorVerdict::parse);
            let llm_confidence = outcome.value.get("confidence").and_then(DynValue::as_f64).unwrap_or(input.confidence);

            let merged = merge_verdict(rule_verdict, llm_verdict);
            if merged != rule_verdict {
                evidence.push(format!("LLM tightened verdict to {}", merged.as_str()));
            }
            if outcome.used_fallback {
                evidence.push("LLM unavailable; used rule-based verdict".into());
            }

            (merged, (input.confidence + llm_confidence) / 2.0)
        }
    };

    let decision = AgentDecision::new(verdict.as_str(), confidence, verdict.next_step()).with_evidence(evidence);
    emit_stage_audit(deps.audit, &format!("supervisor_{}", input.checkpoint), input.exception, &decision).await;

    SupervisorOutcome { decision, verdict }
}
