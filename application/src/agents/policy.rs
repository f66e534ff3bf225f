//! Policy stage: decides `{ALLOW, BLOCK, REQUIRE_APPROVAL}` and
//! classifies actionability.

use super::{emit_stage_audit, StageDeps, DISAGREEMENT_PENALTY};
use crate::llm::{call_with_fallback, SchemaName};
use crate::playbooks::{classify_actionability, select_playbook, Actionability};
use exception_platform_domain::pack::requires_approval;
use exception_platform_domain::{AgentDecision, DomainPack, DynValue, ExceptionRecord, Severity, TenantPolicyPack};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyDecision {
    Allow,
    Block,
    RequireApproval,
}

impl PolicyDecision {
    fn as_str(&self) -> &'static str {
        match self {
            PolicyDecision::Allow => "ALLOW",
            PolicyDecision::Block => "BLOCK",
            PolicyDecision::RequireApproval => "REQUIRE_APPROVAL",
        }
    }

    fn next_step(&self) -> &'static str {
        match self {
            PolicyDecision::Allow => "ProceedToResolution",
            PolicyDecision::Block => "NonActionable",
            PolicyDecision::RequireApproval => "PendingApproval",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_uppercase().as_str() {
            "ALLOW" => Some(PolicyDecision::Allow),
            "BLOCK" => Some(PolicyDecision::Block),
            "REQUIRE_APPROVAL" => Some(PolicyDecision::RequireApproval),
            _ => None,
        }
    }
}

pub struct PolicyInput<'a> {
    pub exception: &'a ExceptionRecord,
    pub exception_type: &'a str,
    pub severity: Severity,
    pub triage_confidence: f64,
    pub domain_pack: &'a DomainPack,
    pub tenant_policy: &'a TenantPolicyPack,
}

pub struct PolicyOutcome {
    pub decision: AgentDecision,
    pub policy_decision: PolicyDecision,
    pub actionability: Actionability,
    pub selected_playbook_exception_type: Option<String>,
}

/// Rule-based decision: `NON_ACTIONABLE_INFO_ONLY` → BLOCK; otherwise ALLOW
/// unless a human-approval condition fires, in which case REQUIRE_APPROVAL.
fn rule_based(input: &PolicyInput<'_>, actionability: Actionability) -> (PolicyDecision, f64, Vec<String>) {
    let mut evidence = Vec::new();
    let effective_guardrails = input
        .domain_pack
        .guardrails
        .with_overrides(input.tenant_policy.custom_guardrails.as_ref());

    if actionability == Actionability::NonActionableInfoOnly {
        evidence.push("no matching approved playbook: non-actionable".into());
        return (PolicyDecision::Block, input.triage_confidence, evidence);
    }

    let approval_required = requires_approval(&input.tenant_policy.human_approval_rules, input.severity)
        || input.triage_confidence < effective_guardrails.human_approval_threshold;

    if approval_required {
        evidence.push("human approval rule or confidence floor requires approval".into());
        (PolicyDecision::RequireApproval, input.triage_confidence, evidence)
    } else {
        evidence.push("actionable and within guardrails: allow".into());
        (PolicyDecision::Allow, input.triage_confidence, evidence)
    }
}

/// When the rule-based decision is `BLOCK`, the LLM can raise it only to
/// `REQUIRE_APPROVAL`, never to `ALLOW`; otherwise the more restrictive of
/// the two decisions wins.
fn merge_decision(rule: PolicyDecision, llm: Option<PolicyDecision>) -> PolicyDecision {
    match (rule, llm) {
        (PolicyDecision::Block, Some(PolicyDecision::Allow)) => PolicyDecision::RequireApproval,
        (PolicyDecision::Block, Some(PolicyDecision::RequireApproval)) => PolicyDecision::RequireApproval,
        (PolicyDecision::Block, _) => PolicyDecision::Block,
        (PolicyDecision::RequireApproval, Some(PolicyDecision::Block)) => PolicyDecision::Block,
        (PolicyDecision::RequireApproval, _) => PolicyDecision::RequireApproval,
        (PolicyDecision::Allow, Some(PolicyDecision::Block)) => PolicyDecision::Block,
        (PolicyDecision::Allow, Some(PolicyDecision::RequireApproval)) => PolicyDecision::RequireApproval,
        (PolicyDecision::Allow, _) => PolicyDecision::Allow,
    }
}

pub async fn process(input: PolicyInput<'_>, deps: &StageDeps<'_>) -> PolicyOutcome {
    let actionability = classify_actionability(input.exception_type, input.tenant_policy, input.domain_pack);
    let (rule_decision, rule_confidence, mut evidence) = rule_based(&input, actionability);

    let selected_playbook_exception_type = select_playbook(input.exception_type, input.tenant_policy, input.domain_pack)
        .map(|p| p.exception_type);

    let (final_decision, confidence) = match deps.llm {
        None => (rule_decision, rule_confidence),
        Some(client) => {
            let mut context = DynValue::object();
            context.set("exception_type", DynValue::String(input.exception_type.to_string()));
            context.set("actionability", DynValue::String(format!("{actionability:?}")));
            context.set("rule_decision", DynValue::String(rule_decision.as_str().to_string()));

            let prompt = format!(
                "Review this actionability classification ({actionability:?}) for exception type '{}' and decide ALLOW/BLOCK/REQUIRE_APPROVAL. Rule-based decision: {}.",
                input.exception_type,
                rule_decision.as_str()
            );

            let outcome = call_with_fallback(
                "policy",
                Some(input.exception.tenant_id.as_str()),
                Some(input.domain_pack.domain_name.as_str()),
                client,
                deps.breaker,
                SchemaName::Policy,
                &prompt,
                &context,
                &deps.retry,
                deps.audit,
                || {
                    let mut v = DynValue::object();
                    v.set("decision", DynValue::String(rule_decision.as_str().to_string()));
                    v.set("confidence", DynValue::Number(rule_confidence));
                    v
                },
            )
            .await;

            let llm_decision = outcome.value.get("decision").and_then(DynValue::as_str).and_then(PolicyDecision::parse);
            let llm_confidence = outcome.value.get("confidence").and_then(DynValue::as_f64).unwrap_or(rule_confidence);

            let merged = merge_decision(rule_decision, llm_decision);
            if merged != rule_decision {
                evidence.push(format!(
                    "LLM opinion adjusted decision from {} to {}",
                    rule_decision.as_str(),
                    merged.as_str()
                ));
            }

            let mut merged_confidence = (rule_confidence + llm_confidence) / 2.0;
            if llm_decision == Some(rule_decision) {
                merged_confidence = (merged_confidence * 1.1).min(1.0);
            } else {
                merged_confidence *= DISAGREEMENT_PENALTY;
            }
            if outcome.used_fallback {
                evidence.push("LLM unavailable; used rule-based result".into());
            }

            (merged, merged_confidence)
        }
    };

    let mut decision = AgentDecision::new(final_decision.as_str(), confidence, final_decision.next_step()).with_evidence(evidence);
    let mut metadata = DynValue::object();
    metadata.set("actionability", DynValue::String(format!("{actionability:?}")));
    if let Some(pb) = &selected_playbook_exception_type {
        metadata.set("selected_playbook", DynValue::String(pb.clone()));
    }
    decision.metadata = metadata;

    emit_stage_audit(deps.audit, "policy", input.exception, &decision).await;

    PolicyOutcome {
        decision,
        policy_decision: final_decision,
        actionability,
        selected_playbook_exception_type,
    }
}
