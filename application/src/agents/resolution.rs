//! Resolution stage: turns Policy's actionability + selected
//! playbook into a resolved plan, a draft suggestion, or nothing. The LLM
//! contribution here is advisory only — it narrates ordering, rationale,
//! and rejected alternatives, but it can never add, remove, or reorder the
//! tools a plan actually runs.
//!
//! This stage builds the plan; it does not drive the five-gate execution
//! engine itself — that is the orchestrator's job once a
//! resolved plan exists, keeping this stage's dependencies the same shape
//! (`StageDeps`) as the other four (see DESIGN.md).

use super::{emit_stage_audit, StageDeps};
use crate::llm::{call_with_fallback, SchemaName};
use crate::playbooks::{select_playbook, Actionability};
use exception_platform_domain::{AgentDecision, DomainPack, DynValue, ExceptionRecord, TenantPolicyPack};

#[derive(Debug, Clone)]
pub struct ResolvedStepPreview {
    pub action: String,
    pub tool_name: Option<String>,
    pub parameters: DynValue,
}

#[derive(Debug, Clone)]
pub struct ResolvedPlan {
    pub exception_type: String,
    pub steps: Vec<ResolvedStepPreview>,
}

#[derive(Debug, Clone)]
pub struct DraftPlaybook {
    pub exception_type: String,
    pub steps: Vec<ResolvedStepPreview>,
    /// Always `false` — a draft is never auto-approved.
    pub approved: bool,
}

pub struct ResolutionInput<'a> {
    pub exception: &'a ExceptionRecord,
    pub exception_type: &'a str,
    pub policy_confidence: f64,
    pub actionability: Actionability,
    pub domain_pack: &'a DomainPack,
    pub tenant_policy: &'a TenantPolicyPack,
}

pub struct ResolutionOutcome {
    pub decision: AgentDecision,
    pub resolved_plan: Option<ResolvedPlan>,
    pub suggested_draft: Option<DraftPlaybook>,
}

fn preview_steps(steps: &[exception_platform_domain::PlaybookStep]) -> Vec<ResolvedStepPreview> {
    steps
        .iter()
        .map(|s| ResolvedStepPreview {
            action: s.action.clone(),
            tool_name: s.extract_tool_name().map(str::to_string),
            parameters: s.parameters.clone().unwrap_or_else(DynValue::object),
        })
        .collect()
}

pub async fn process(input: ResolutionInput<'_>, deps: &StageDeps<'_>) -> ResolutionOutcome {
    let mut evidence = Vec::new();

    let (resolved_plan, suggested_draft, decision_label) = match input.actionability {
        Actionability::ActionableApprovedProcess => {
            let playbook = select_playbook(input.exception_type, input.tenant_policy, input.domain_pack)
                .expect("actionability classification guarantees a selectable playbook");
            evidence.push(format!("resolved plan with {} step(s)", playbook.steps.len()));
            (
                Some(ResolvedPlan {
                    exception_type: playbook.exception_type.clone(),
                    steps: preview_steps(&playbook.steps),
                }),
                None,
                "PlanResolved",
            )
        }
        Actionability::ActionableNonApprovedProcess => {
            let candidate = input
                .domain_pack
                .playbook_for(input.exception_type)
                .expect("actionability classification guarantees a candidate playbook");
            evidence.push("playbook exists but is not fully approved for this tenant: drafting suggestion".into());
            (
                None,
                Some(DraftPlaybook {
                    exception_type: candidate.exception_type.clone(),
                    steps: preview_steps(&candidate.steps),
                    approved: false,
                }),
                "DraftSuggested",
            )
        }
        Actionability::NonActionableInfoOnly => {
            evidence.push("no playbook available: informational only".into());
            (None, None, "NoPlan")
        }
    };

    let confidence = match deps.llm {
        None => input.policy_confidence,
        Some(client) => {
            let mut context = DynValue::object();
            context.set("exception_type", DynValue::String(input.exception_type.to_string()));
            context.set("actionability", DynValue::String(format!("{:?}", input.actionability)));

            let prompt = format!(
                "Explain the ordering and rationale for resolving exception type '{}' ({:?}). You may not alter which tools run.",
                input.exception_type, input.actionability
            );

            let outcome = call_with_fallback(
                "resolution",
                Some(input.exception.tenant_id.as_str()),
                Some(input.domain_pack.domain_name.as_str()),
                client,
                deps.breaker,
                SchemaName::Resolution,
                &prompt,
                &context,
                &deps.retry,
                deps.audit,
                || {
                    let mut v = DynValue::object();
                    v.set("confidence", DynValue::Number(input.policy_confidence));
                    v
                },
            )
            .await;

            if let Some(rationale) = outcome.value.get("reasoning_steps").and_then(DynValue::as_str) {
                evidence.push(format!("LLM rationale: {rationale}"));
            }
            if outcome.used_fallback {
                evidence.push("LLM unavailable; used rule-based plan only".into());
            }
            outcome.value.get("confidence").and_then(DynValue::as_f64).unwrap_or(input.policy_confidence)
        }
    };

    let decision = AgentDecision::new(decision_label, confidence, "ProceedToSupervisor").with_evidence(evidence);
    emit_stage_audit(deps.audit, "resolution", input.exception, &decision).await;

    ResolutionOutcome { decision, resolved_plan, suggested_draft }
}
