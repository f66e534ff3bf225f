//! Feedback stage: aggregates outcome statistics per
//! `(tenant, exception_type)` and, when warranted, drafts a recommendation
//! for human review. No recommendation is ever auto-applied.
//!
//! The false-ratio threshold and minimum sample size are not pinned by the
//! source lineage; they are fixed here at [`FALSE_RATIO_THRESHOLD`] and
//! [`MIN_SAMPLE_SIZE`] (resolved Open Question, see DESIGN.md).

use super::{emit_stage_audit, StageDeps};
use crate::llm::{call_with_fallback, SchemaName};
use crate::ports::{FeedbackStore, ObservationCounts};
use exception_platform_domain::{AgentDecision, DynValue, ExceptionRecord};

/// Ratio of false positives or false negatives, over total observations,
/// above which a recommendation is drafted.
pub const FALSE_RATIO_THRESHOLD: f64 = 0.2;
/// Minimum observation count before a ratio is trusted enough to act on.
pub const MIN_SAMPLE_SIZE: u64 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecommendationKind {
    GuardrailTuning,
    PlaybookOptimization,
}

#[derive(Debug, Clone)]
pub struct FeedbackRecommendation {
    pub exception_type: String,
    pub kind: RecommendationKind,
    pub rationale: String,
    /// Always `true` — recommendations are never auto-applied.
    pub review_required: bool,
}

pub struct FeedbackInput<'a> {
    pub exception: &'a ExceptionRecord,
    pub exception_type: &'a str,
    pub was_false_positive: bool,
    pub was_false_negative: bool,
    pub feedback_store: &'a dyn FeedbackStore,
    pub domain: &'a str,
}

pub struct FeedbackOutcome {
    pub decision: AgentDecision,
    pub counts: ObservationCounts,
    pub recommendation: Option<FeedbackRecommendation>,
}

fn warrants_recommendation(counts: ObservationCounts) -> Option<(f64, f64)> {
    if counts.total < MIN_SAMPLE_SIZE {
        return None;
    }
    let fp_ratio = counts.false_positive as f64 / counts.total as f64;
    let fn_ratio = counts.false_negative as f64 / counts.total as f64;
    if fp_ratio > FALSE_RATIO_THRESHOLD || fn_ratio > FALSE_RATIO_THRESHOLD {
        Some((fp_ratio, fn_ratio))
    } else {
        None
    }
}

pub async fn process(input: FeedbackInput<'_>, deps: &StageDeps<'_>) -> FeedbackOutcome {
    let counts = input.feedback_store.record(
        &input.exception.tenant_id,
        input.exception_type,
        input.was_false_positive,
        input.was_false_negative,
    );

    let mut evidence = vec![format!(
        "observations for '{}': total={} false_positive={} false_negative={}",
        input.exception_type, counts.total, counts.false_positive, counts.false_negative
    )];

    let ratios = warrants_recommendation(counts);
    let mut recommendation = ratios.map(|(fp_ratio, fn_ratio)| {
        let kind = if fp_ratio > fn_ratio {
            RecommendationKind::GuardrailTuning
        } else {
            RecommendationKind::PlaybookOptimization
        };
        evidence.push(format!(
            "false ratio exceeds threshold (fp={:.2} fn={:.2} > {:.2}) over {} observations: drafting recommendation",
            fp_ratio, fn_ratio, FALSE_RATIO_THRESHOLD, counts.total
        ));
        FeedbackRecommendation {
            exception_type: input.exception_type.to_string(),
            kind,
            rationale: "false-positive/false-negative ratio exceeded the configured threshold".to_string(),
            review_required: true,
        }
    });

    let confidence = match (deps.llm, &recommendation) {
        (Some(client), Some(_)) => {
            let mut context = DynValue::object();
            context.set("exception_type", DynValue::String(input.exception_type.to_string()));
            context.set("total", DynValue::Number(counts.total as f64));
            context.set("false_positive", DynValue::Number(counts.false_positive as f64));
            context.set("false_negative", DynValue::Number(counts.false_negative as f64));

            let prompt = format!(
                "Draft a rationale for tuning guardrails or playbooks for exception type '{}' given {} observations.",
                input.exception_type, counts.total
            );

            let outcome = call_with_fallback(
                "feedback",
                Some(input.exception.tenant_id.as_str()),
                Some(input.domain),
                client,
                deps.breaker,
                SchemaName::Feedback,
                &prompt,
                &context,
                &deps.retry,
                deps.audit,
                || {
                    let mut v = DynValue::object();
                    v.set("confidence", DynValue::Number(0.5));
                    v
                },
            )
            .await;

            if let Some(rationale) = outcome.value.get("summary").and_then(DynValue::as_str) {
                if let Some(rec) = recommendation.as_mut() {
                    rec.rationale = rationale.to_string();
                }
            }
            if outcome.used_fallback {
                evidence.push("LLM unavailable; used rule-based rationale".into());
            }
            outcome.value.get("confidence").and_then(DynValue::as_f64).unwrap_or(0.5)
        }
        _ => 1.0,
    };

    let next_step = if recommendation.is_some() { "RecommendationPendingReview" } else { "NoActionNeeded" };
    let decision = AgentDecision::new("FEEDBACK_RECORDED", confidence, next_step).with_evidence(evidence);
    emit_stage_audit(deps.audit, "feedback", input.exception, &decision).await;

    FeedbackOutcome { decision, counts, recommendation }
}
