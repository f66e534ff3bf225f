//! Orchestrator: synchronous Triage → Supervisor(optional)
//! → Policy → Supervisor(post-policy) → Resolution → Supervisor
//! (post-resolution) → Feedback sequence, with identical semantics to the
//! worker-mesh path for a single exception.
//!
//! The post-triage Supervisor checkpoint is optional: this
//! implementation invokes it only when Triage names `Severity::Critical`
//! (resolved Open Question, see DESIGN.md) — non-critical exceptions skip
//! straight to Policy.
//!
//! Feedback needs to know whether the case turned out to be a false
//! positive or false negative, which is only knowable once a human or
//! automation closes the case — outside a single synchronous pass. `run`
//! accepts an optional outcome evaluation; when absent, the Feedback stage
//! is skipped rather than invoked with fabricated flags (resolved Open
//! Question, see DESIGN.md).

use crate::agents::feedback::{FeedbackInput, FeedbackOutcome};
use crate::agents::policy::{PolicyDecision, PolicyInput, PolicyOutcome};
use crate::agents::resolution::{ResolutionInput, ResolutionOutcome};
use crate::agents::supervisor::{SupervisorInput, SupervisorOutcome, SupervisorVerdict};
use crate::agents::triage::{TriageInput, TriageOutcome};
use crate::agents::{self, StageDeps};
use crate::execution::{ExecutionEngine, GateInputs, StepStatus};
use crate::playbooks::{select_playbook, Actionability};
use crate::ports::{ExceptionRepository, FeedbackStore, ToolExecutorPort};
use exception_platform_domain::{DomainPack, DynValue, ExceptionRecord, ExceptionStatus, Severity, TenantPolicyPack};

pub struct OrchestratorDeps<'a> {
    pub stage: StageDeps<'a>,
    pub tool_executor: &'a dyn ToolExecutorPort,
    pub feedback_store: &'a dyn FeedbackStore,
    pub repository: &'a dyn ExceptionRepository,
    /// Dry-run posture for every tool invocation the execution engine
    /// drives. Computed by the caller as `app_config.dry_run_tools &&
    /// !cli.no_dry_run`.
    pub dry_run: bool,
}

pub struct CaseOutcomeEvaluation {
    pub was_false_positive: bool,
    pub was_false_negative: bool,
}

pub struct OrchestratorResult {
    pub triage: TriageOutcome,
    pub post_triage_checkpoint: Option<SupervisorOutcome>,
    pub policy: Option<PolicyOutcome>,
    pub post_policy_checkpoint: Option<SupervisorOutcome>,
    pub resolution: Option<ResolutionOutcome>,
    pub post_resolution_checkpoint: Option<SupervisorOutcome>,
    pub feedback: Option<FeedbackOutcome>,
}

pub async fn run(
    exception: &mut ExceptionRecord,
    domain_pack: &DomainPack,
    tenant_policy: &TenantPolicyPack,
    similar_cases: &[DynValue],
    outcome_evaluation: Option<CaseOutcomeEvaluation>,
    deps: &OrchestratorDeps<'_>,
) -> OrchestratorResult {
    exception.status = ExceptionStatus::Analyzing;

    let triage = agents::triage::process(TriageInput { exception, domain_pack, similar_cases }, &deps.stage).await;
    exception.exception_type = Some(triage.exception_type.clone());
    exception.severity = Some(triage.severity);
    let _ = deps.repository.save(exception).await;

    let effective_guardrails = domain_pack.guardrails.with_overrides(tenant_policy.custom_guardrails.as_ref());

    let mut post_triage_checkpoint = None;
    if triage.severity == Severity::Critical {
        let checkpoint = agents::supervisor::process(
            SupervisorInput {
                exception,
                checkpoint: "post_triage",
                severity: triage.severity,
                confidence: triage.decision.confidence,
                prior_decisions_summary: &format!("triage={}", triage.decision.decision),
                guardrails: &effective_guardrails,
                domain: domain_pack.domain_name.as_str(),
            },
            &deps.stage,
        )
        .await;
        let halt = apply_checkpoint(exception, &checkpoint);
        post_triage_checkpoint = Some(checkpoint);
        if halt {
            let _ = deps.repository.save(exception).await;
            return OrchestratorResult {
                triage,
                post_triage_checkpoint,
                policy: None,
                post_policy_checkpoint: None,
                resolution: None,
                post_resolution_checkpoint: None,
                feedback: None,
            };
        }
    }

    let policy = agents::policy::process(
        PolicyInput {
            exception,
            exception_type: &triage.exception_type,
            severity: triage.severity,
            triage_confidence: triage.decision.confidence,
            domain_pack,
            tenant_policy,
        },
        &deps.stage,
    )
    .await;
    let _ = deps.repository.save(exception).await;

    let post_policy_checkpoint = agents::supervisor::process(
        SupervisorInput {
            exception,
            checkpoint: "post_policy",
            severity: triage.severity,
            confidence: policy.decision.confidence,
            prior_decisions_summary: &format!("policy={}", policy.decision.decision),
            guardrails: &effective_guardrails,
            domain: domain_pack.domain_name.as_str(),
        },
        &deps.stage,
    )
    .await;
    if apply_checkpoint(exception, &post_policy_checkpoint) {
        let _ = deps.repository.save(exception).await;
        return OrchestratorResult {
            triage,
            post_triage_checkpoint,
            policy: Some(policy),
            post_policy_checkpoint: Some(post_policy_checkpoint),
            resolution: None,
            post_resolution_checkpoint: None,
            feedback: None,
        };
    }

    let resolution = agents::resolution::process(
        ResolutionInput {
            exception,
            exception_type: &triage.exception_type,
            policy_confidence: policy.decision.confidence,
            actionability: policy.actionability,
            domain_pack,
            tenant_policy,
        },
        &deps.stage,
    )
    .await;
    let _ = deps.repository.save(exception).await;

    if policy.policy_decision == PolicyDecision::Allow && policy.actionability == Actionability::ActionableApprovedProcess {
        drive_execution(exception, domain_pack, tenant_policy, &policy, &resolution, &effective_guardrails, deps).await;
        let _ = deps.repository.save(exception).await;
    }

    let post_resolution_checkpoint = agents::supervisor::process(
        SupervisorInput {
            exception,
            checkpoint: "post_resolution",
            severity: triage.severity,
            confidence: resolution.decision.confidence,
            prior_decisions_summary: &format!("resolution={}", resolution.decision.decision),
            guardrails: &effective_guardrails,
            domain: domain_pack.domain_name.as_str(),
        },
        &deps.stage,
    )
    .await;
    let halted = apply_checkpoint(exception, &post_resolution_checkpoint);
    let _ = deps.repository.save(exception).await;
    if halted {
        return OrchestratorResult {
            triage,
            post_triage_checkpoint,
            policy: Some(policy),
            post_policy_checkpoint: Some(post_policy_checkpoint),
            resolution: Some(resolution),
            post_resolution_checkpoint: Some(post_resolution_checkpoint),
            feedback: None,
        };
    }

    if exception.status == ExceptionStatus::Analyzing {
        exception.status = ExceptionStatus::Resolved;
        let _ = deps.repository.save(exception).await;
    }

    let feedback = match outcome_evaluation {
        Some(eval) => Some(
            agents::feedback::process(
                FeedbackInput {
                    exception,
                    exception_type: &triage.exception_type,
                    was_false_positive: eval.was_false_positive,
                    was_false_negative: eval.was_false_negative,
                    feedback_store: deps.feedback_store,
                    domain: domain_pack.domain_name.as_str(),
                },
                &deps.stage,
            )
            .await,
        ),
        None => None,
    };

    OrchestratorResult {
        triage,
        post_triage_checkpoint,
        policy: Some(policy),
        post_policy_checkpoint: Some(post_policy_checkpoint),
        resolution: Some(resolution),
        post_resolution_checkpoint: Some(post_resolution_checkpoint),
        feedback,
    }
}

/// Applies a checkpoint's verdict to the exception status, returning
/// whether the pipeline should halt (`INTERVENED`/`ESCALATED`).
fn apply_checkpoint(exception: &mut ExceptionRecord, checkpoint: &SupervisorOutcome) -> bool {
    match checkpoint.verdict {
        SupervisorVerdict::ApprovedFlow => false,
        SupervisorVerdict::Intervened => {
            exception.status = ExceptionStatus::NeedsApproval;
            true
        }
        SupervisorVerdict::Escalated => {
            exception.status = ExceptionStatus::Escalated;
            true
        }
    }
}

/// Drives the five-gate execution engine one step at a time over the
/// resolved plan, matching the worker mesh's one-step-at-a-time contract
///.
async fn drive_execution(
    exception: &mut ExceptionRecord,
    domain_pack: &DomainPack,
    tenant_policy: &TenantPolicyPack,
    policy: &PolicyOutcome,
    resolution: &ResolutionOutcome,
    effective_guardrails: &exception_platform_domain::Guardrails,
    deps: &OrchestratorDeps<'_>,
) {
    let Some(plan) = &resolution.resolved_plan else {
        return;
    };
    let Some(playbook) = select_playbook(&plan.exception_type, tenant_policy, domain_pack) else {
        return;
    };

    let tenant_id = exception.tenant_id.clone();
    let engine = ExecutionEngine::new(deps.tool_executor, deps.stage.audit);
    let gates = GateInputs {
        policy_is_actionable_approved: true,
        severity: exception.severity.unwrap_or(Severity::Medium),
        human_approval_rules: &tenant_policy.human_approval_rules,
        confidence: policy.decision.confidence,
        guardrails: effective_guardrails,
    };

    for (index, step) in playbook.steps.iter().enumerate() {
        let step_number = index as u32 + 1;
        let outcome = engine
            .run_step(step, exception, step_number, &tenant_id, tenant_policy, domain_pack, &gates, deps.dry_run)
            .await;
        exception.advance_step();
        match outcome.status {
            StepStatus::Success | StepStatus::Skipped => continue,
            StepStatus::NeedsApproval => {
                exception.status = ExceptionStatus::NeedsApproval;
                break;
            }
            StepStatus::Failed => {
                exception.status = ExceptionStatus::Escalated;
                break;
            }
            StepStatus::Pending | StepStatus::Executing => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::test_support::RecordingAuditSink;
    use crate::llm::CircuitBreakerRegistry;
    use crate::ports::{ObservationCounts, RepositoryError, ToolInvocationError, ToolInvocationResult};
    use async_trait::async_trait;
    use exception_platform_domain::{Guardrails, Playbook, PlaybookStep, TenantId};
    use std::sync::Mutex;

    struct FakeRepository {
        saved: Mutex<Vec<ExceptionRecord>>,
    }

    #[async_trait]
    impl ExceptionRepository for FakeRepository {
        async fn save(&self, record: &ExceptionRecord) -> Result<(), RepositoryError> {
            self.saved.lock().unwrap().push(record.clone());
            Ok(())
        }

        async fn get(&self, tenant_id: &TenantId, exception_id: &exception_platform_domain::ExceptionId) -> Result<ExceptionRecord, RepositoryError> {
            self.saved
                .lock()
                .unwrap()
                .iter()
                .rev()
                .find(|r| &r.tenant_id == tenant_id && &r.exception_id == exception_id)
                .cloned()
                .ok_or_else(|| RepositoryError::NotFound {
                    tenant_id: tenant_id.to_string(),
                    exception_id: exception_id.to_string(),
                })
        }
    }

    struct AlwaysOkExecutor;

    #[async_trait]
    impl ToolExecutorPort for AlwaysOkExecutor {
        async fn invoke(
            &self,
            tool_name: &str,
            _args: &DynValue,
            _tenant_id: &TenantId,
            _tenant_policy: &TenantPolicyPack,
            _domain_pack: &DomainPack,
            dry_run: bool,
        ) -> Result<ToolInvocationResult, ToolInvocationError> {
            Ok(ToolInvocationResult { tool_name: tool_name.into(), output: DynValue::object(), dry_run })
        }
    }

    #[derive(Default)]
    struct NoopFeedbackStore;
    impl FeedbackStore for NoopFeedbackStore {
        fn record(&self, _tenant_id: &TenantId, _exception_type: &str, _was_fp: bool, _was_fn: bool) -> ObservationCounts {
            ObservationCounts::default()
        }
        fn counts(&self, _tenant_id: &TenantId, _exception_type: &str) -> ObservationCounts {
            ObservationCounts::default()
        }
    }

    fn domain_pack() -> DomainPack {
        DomainPack {
            domain_name: "Finance".into(),
            version: "1".into(),
            exception_types: Default::default(),
            tools: Default::default(),
            playbooks: vec![Playbook {
                exception_type: "SETTLEMENT_FAIL".into(),
                steps: vec![PlaybookStep::new("getSettlement('ORD-1')")],
            }],
            guardrails: Guardrails { human_approval_threshold: 0.2, ..Guardrails::default() },
        }
    }

    fn tenant_policy() -> TenantPolicyPack {
        TenantPolicyPack {
            tenant_id: "TENANT_A".into(),
            domain_name: "Finance".into(),
            custom_guardrails: None,
            approved_tools: vec!["getSettlement".into()],
            human_approval_rules: vec![],
            custom_severity_overrides: None,
            custom_playbooks: vec![],
        }
    }

    fn exception() -> ExceptionRecord {
        let mut payload = DynValue::object();
        payload.set("exceptionType", DynValue::String("SETTLEMENT_FAIL".into()));
        payload.set("severity", DynValue::String("HIGH".into()));
        ExceptionRecord::new("EX-001", "TENANT_A", "src", "Finance", chrono::Utc::now(), payload)
    }

    #[tokio::test]
    async fn full_pipeline_resolves_an_approved_case() {
        let pack = domain_pack();
        let tenant = tenant_policy();
        let mut exception = exception();
        let audit = RecordingAuditSink::default();
        let breaker = CircuitBreakerRegistry::default();
        let repository = FakeRepository { saved: Mutex::new(vec![]) };
        let executor = AlwaysOkExecutor;
        let feedback_store = NoopFeedbackStore;

        let deps = OrchestratorDeps {
            stage: StageDeps { llm: None, breaker: &breaker, retry: Default::default(), audit: &audit },
            tool_executor: &executor,
            feedback_store: &feedback_store,
            repository: &repository,
            dry_run: true,
        };

        let result = run(&mut exception, &pack, &tenant, &[], None, &deps).await;

        assert!(result.post_triage_checkpoint.is_none());
        assert_eq!(result.policy.unwrap().policy_decision, PolicyDecision::Allow);
        assert!(result.resolution.unwrap().resolved_plan.is_some());
        assert_eq!(exception.status, ExceptionStatus::Resolved);
        assert!(!repository.saved.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn critical_severity_escalates_before_policy_runs() {
        let pack = domain_pack();
        let tenant = tenant_policy();
        let mut exception = exception();
        exception.raw_payload.set("severity", DynValue::String("CRITICAL".into()));
        let audit = RecordingAuditSink::default();
        let breaker = CircuitBreakerRegistry::default();
        let repository = FakeRepository { saved: Mutex::new(vec![]) };
        let executor = AlwaysOkExecutor;
        let feedback_store = NoopFeedbackStore;

        let deps = OrchestratorDeps {
            stage: StageDeps { llm: None, breaker: &breaker, retry: Default::default(), audit: &audit },
            tool_executor: &executor,
            feedback_store: &feedback_store,
            repository: &repository,
            dry_run: true,
        };

        let result = run(&mut exception, &pack, &tenant, &[], None, &deps).await;

        assert!(result.post_triage_checkpoint.is_some());
        assert!(result.policy.is_none());
        assert_eq!(exception.status, ExceptionStatus::Escalated);
    }
}
