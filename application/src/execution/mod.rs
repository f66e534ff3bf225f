//! Playbook execution engine: drives one step at a time
//! under gating guardrails, with placeholder resolution and
//! rollback/escalation on failure.

use crate::ports::{AuditEvent, AuditSink, ToolExecutorPort, ToolInvocationError};
use exception_platform_domain::pack::requires_approval;
use exception_platform_domain::{
    DomainPack, DynValue, ExceptionRecord, Guardrails, PlaybookStep, Severity, TenantId, TenantPolicyPack,
};
use std::sync::LazyLock;

static PLACEHOLDER_PATTERN: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"\{\{([A-Za-z0-9_.]+)\}\}").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Pending,
    Executing,
    Success,
    Failed,
    Skipped,
    NeedsApproval,
}

#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub status: StepStatus,
    pub reason: Option<String>,
    pub unresolved_placeholders: Vec<String>,
    pub rollback_attempted: bool,
    pub escalation_attempted: bool,
}

impl StepOutcome {
    fn gate_blocked(status: StepStatus, reason: impl Into<String>) -> Self {
        Self {
            status,
            reason: Some(reason.into()),
            unresolved_placeholders: Vec::new(),
            rollback_attempted: false,
            escalation_attempted: false,
        }
    }
}

/// Inputs the five gates are evaluated against.
pub struct GateInputs<'a> {
    pub policy_is_actionable_approved: bool,
    pub severity: Severity,
    pub human_approval_rules: &'a [exception_platform_domain::pack::HumanApprovalRule],
    pub confidence: f64,
    pub guardrails: &'a Guardrails,
}

/// Evaluates the five gates. Returns `Some(reason)` for the first failing
/// gate, or `None` if all gates pass and the step may proceed to tool
/// allow-list resolution.
fn first_failing_gate(inputs: &GateInputs) -> Option<(StepStatus, String)> {
    if !inputs.policy_is_actionable_approved {
        return Some((StepStatus::Skipped, "policy did not return ACTIONABLE_APPROVED_PROCESS".into()));
    }
    if inputs.severity == Severity::Critical {
        return Some((StepStatus::NeedsApproval, "severity is CRITICAL".into()));
    }
    if requires_approval(inputs.human_approval_rules, inputs.severity) {
        return Some((StepStatus::NeedsApproval, "human approval rule requires approval for this severity".into()));
    }
    if inputs.confidence < inputs.guardrails.human_approval_threshold {
        return Some((
            StepStatus::NeedsApproval,
            format!(
                "confidence {:.2} below human_approval_threshold {:.2}",
                inputs.confidence, inputs.guardrails.human_approval_threshold
            ),
        ));
    }
    None
}

/// Resolves `{{key}}` placeholders in string parameter values from
/// `normalized_context` (or `raw_payload`). Unresolved placeholders are
/// left in place and reported for the caller to record in step metadata
///.
pub fn resolve_placeholders(value: &str, exception: &ExceptionRecord) -> (String, Vec<String>) {
    let mut unresolved = Vec::new();
    let resolved = PLACEHOLDER_PATTERN.replace_all(value, |caps: &regex::Captures| {
        let key = &caps[1];
        match exception.lookup_context(key).and_then(DynValue::as_str) {
            Some(v) => v.to_string(),
            None => {
                unresolved.push(key.to_string());
                caps[0].to_string()
            }
        }
    });
    (resolved.into_owned(), unresolved)
}

pub struct ExecutionEngine<'a> {
    pub tool_executor: &'a dyn ToolExecutorPort,
    pub audit: &'a dyn AuditSink,
}

impl<'a> ExecutionEngine<'a> {
    pub fn new(tool_executor: &'a dyn ToolExecutorPort, audit: &'a dyn AuditSink) -> Self {
        Self { tool_executor, audit }
    }

    /// Runs the single next step of the playbook against the gates, then
    /// (if all gates pass) invokes the tool; on `Failed`, attempts a
    /// single `rollback` then a single `escalate`, both halting execution
    /// regardless of outcome. Emits one audit record for the step
    /// transition plus one per rollback/escalation attempt.
    #[allow(clippy::too_many_arguments)]
    pub async fn run_step(
        &self,
        step: &PlaybookStep,
        exception: &ExceptionRecord,
        step_number: u32,
        tenant_id: &TenantId,
        tenant_policy: &TenantPolicyPack,
        domain_pack: &DomainPack,
        gates: &GateInputs<'_>,
        dry_run: bool,
    ) -> StepOutcome {
        let tool_name = step.extract_tool_name();

        if let Some((status, reason)) = first_failing_gate(gates) {
            let outcome = StepOutcome::gate_blocked(status, reason);
            self.audit_step(exception, step_number, &outcome).await;
            return outcome;
        }

        let Some(tool_name) = tool_name else {
            // Declarative, non-tool-bearing action (notify, assign_owner, ...):
            // nothing to invoke, succeeds trivially once gates pass.
            let outcome = StepOutcome {
                status: StepStatus::Success,
                reason: None,
                unresolved_placeholders: Vec::new(),
                rollback_attempted: false,
                escalation_attempted: false,
            };
            self.audit_step(exception, step_number, &outcome).await;
            return outcome;
        };

        if !self.tool_executor.is_allowed(domain_pack, tenant_policy, tool_name) {
            let err = ToolInvocationError {
                tool_name: tool_name.to_string(),
                attempts: 0,
                last_error: "tool is not allow-listed for this tenant/domain".into(),
            };
            let outcome = self
                .handle_failure(exception, step_number, err, tenant_id, tenant_policy, domain_pack, Vec::new(), dry_run)
                .await;
            self.audit_step(exception, step_number, &outcome).await;
            return outcome;
        }

        let (args, unresolved) = resolve_step_args(step, exception);

        let outcome = match self
            .tool_executor
            .invoke(tool_name, &args, tenant_id, tenant_policy, domain_pack, dry_run)
            .await
        {
            Ok(_) => StepOutcome {
                status: StepStatus::Success,
                reason: None,
                unresolved_placeholders: unresolved,
                rollback_attempted: false,
                escalation_attempted: false,
            },
            Err(err) => {
                self.handle_failure(exception, step_number, err, tenant_id, tenant_policy, domain_pack, unresolved, dry_run)
                    .await
            }
        };
        self.audit_step(exception, step_number, &outcome).await;
        outcome
    }

    #[allow(clippy::too_many_arguments)]
    async fn handle_failure(
        &self,
        exception: &ExceptionRecord,
        step_number: u32,
        err: ToolInvocationError,
        tenant_id: &TenantId,
        tenant_policy: &TenantPolicyPack,
        domain_pack: &DomainPack,
        unresolved: Vec<String>,
        dry_run: bool,
    ) -> StepOutcome {
        let mut rollback_attempted = false;
        let mut escalation_attempted = false;
        let mut rollback_succeeded = false;

        if domain_pack.has_tool("rollback") && tenant_policy.approves("rollback") {
            rollback_attempted = true;
            rollback_succeeded = self
                .tool_executor
                .invoke("rollback", &DynValue::object(), tenant_id, tenant_policy, domain_pack, dry_run)
                .await
                .is_ok();
            self.audit_recovery(exception, step_number, "rollback", rollback_succeeded).await;
        }

        if !rollback_succeeded && domain_pack.has_tool("escalate") && tenant_policy.approves("escalate") {
            escalation_attempted = true;
            let escalation_succeeded = self
                .tool_executor
                .invoke("escalate", &DynValue::object(), tenant_id, tenant_policy, domain_pack, dry_run)
                .await
                .is_ok();
            self.audit_recovery(exception, step_number, "escalate", escalation_succeeded).await;
        }

        StepOutcome {
            status: StepStatus::Failed,
            reason: Some(err.to_string()),
            unresolved_placeholders: unresolved,
            rollback_attempted,
            escalation_attempted,
        }
    }

    /// Emits `(exception_id, tenant_id, step_number, status, reason?)` for
    /// a step transition.
    async fn audit_step(&self, exception: &ExceptionRecord, step_number: u32, outcome: &StepOutcome) {
        let mut data = DynValue::object();
        data.set("step_number", DynValue::Number(step_number as f64));
        data.set("status", DynValue::String(format!("{:?}", outcome.status)));
        if let Some(reason) = &outcome.reason {
            data.set("reason", DynValue::String(reason.clone()));
        }
        self.record(exception, "step_execution_completed", data).await;
    }

    /// Emits a record for a single rollback/escalation attempt.
    async fn audit_recovery(&self, exception: &ExceptionRecord, step_number: u32, action: &str, succeeded: bool) {
        let mut data = DynValue::object();
        data.set("step_number", DynValue::Number(step_number as f64));
        data.set("action", DynValue::String(action.to_string()));
        data.set("status", DynValue::String(if succeeded { "SUCCESS".to_string() } else { "FAILED".to_string() }));
        self.record(exception, &format!("step_{action}"), data).await;
    }

    async fn record(&self, exception: &ExceptionRecord, event_type: &str, data: DynValue) {
        let event = AuditEvent::new(event_type, chrono::Utc::now(), data)
            .for_exception(exception.tenant_id.clone(), exception.exception_id.clone());
        let _ = self.audit.record(event).await;
    }
}

fn resolve_step_args(step: &PlaybookStep, exception: &ExceptionRecord) -> (DynValue, Vec<String>) {
    let mut unresolved_all = Vec::new();
    let Some(params) = step.parameters.as_ref().and_then(DynValue::as_object) else {
        return (DynValue::object(), unresolved_all);
    };
    let mut resolved = DynValue::object();
    for (key, value) in params {
        if let Some(s) = value.as_str() {
            let (resolved_str, unresolved) = resolve_placeholders(s, exception);
            unresolved_all.extend(unresolved);
            resolved.set(key.clone(), DynValue::String(resolved_str));
        } else {
            resolved.set(key.clone(), value.clone());
        }
    }
    (resolved, unresolved_all)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::test_support::RecordingAuditSink;
    use async_trait::async_trait;
    use exception_platform_domain::pack::ToolDefinition;
    use exception_platform_domain::ExceptionId;
    use std::collections::BTreeMap;
    use std::time::Duration;

    struct FakeExecutor {
        fail_tools: Vec<&'static str>,
    }

    #[async_trait]
    impl ToolExecutorPort for FakeExecutor {
        async fn invoke(
            &self,
            tool_name: &str,
            _args: &DynValue,
            _tenant_id: &TenantId,
            _tenant_policy: &TenantPolicyPack,
            _domain_pack: &DomainPack,
            dry_run: bool,
        ) -> Result<crate::ports::ToolInvocationResult, ToolInvocationError> {
            if self.fail_tools.contains(&tool_name) {
                return Err(ToolInvocationError {
                    tool_name: tool_name.into(),
                    attempts: 1,
                    last_error: "boom".into(),
                });
            }
            Ok(crate::ports::ToolInvocationResult {
                tool_name: tool_name.into(),
                output: DynValue::object(),
                dry_run,
            })
        }
    }

    fn domain_pack(tool_names: &[&str]) -> DomainPack {
        let mut tools = BTreeMap::new();
        for name in tool_names {
            tools.insert(
                name.to_string(),
                ToolDefinition {
                    description: "x".into(),
                    endpoint: "/x".into(),
                    parameter_schema: serde_json::json!({}),
                    version: "1".into(),
                    timeout: Duration::from_secs(1),
                    max_retries: 1,
                },
            );
        }
        DomainPack {
            domain_name: "Finance".into(),
            version: "1".into(),
            exception_types: BTreeMap::new(),
            tools,
            playbooks: vec![],
            guardrails: Guardrails::default(),
        }
    }

    fn tenant_policy(approved: &[&str]) -> TenantPolicyPack {
        TenantPolicyPack {
            tenant_id: "TENANT_A".into(),
            domain_name: "Finance".into(),
            custom_guardrails: None,
            approved_tools: approved.iter().map(|s| s.to_string()).collect(),
            human_approval_rules: vec![],
            custom_severity_overrides: None,
            custom_playbooks: vec![],
        }
    }

    fn exception_with(order_id: &str) -> ExceptionRecord {
        let mut ctx = DynValue::object();
        ctx.set("orderId", DynValue::String(order_id.into()));
        let mut rec = ExceptionRecord::new(
            ExceptionId::from("EX-001"),
            "TENANT_A",
            "src",
            "Finance",
            chrono::Utc::now(),
            DynValue::object(),
        );
        rec.normalized_context = ctx;
        rec.severity = Some(Severity::High);
        rec
    }

    #[tokio::test]
    async fn critical_severity_blocks_with_needs_approval() {
        let executor = FakeExecutor { fail_tools: vec![] };
        let audit = RecordingAuditSink::default();
        let engine = ExecutionEngine::new(&executor, &audit);
        let pack = domain_pack(&["getSettlement"]);
        let tenant = tenant_policy(&["getSettlement"]);
        let exception = exception_with("ORD-1");
        let step = PlaybookStep::new("getSettlement('{{orderId}}')");
        let gates = GateInputs {
            policy_is_actionable_approved: true,
            severity: Severity::Critical,
            human_approval_rules: &[],
            confidence: 0.95,
            guardrails: &Guardrails {
                human_approval_threshold: 0.5,
                ..Guardrails::default()
            },
        };
        let outcome = engine
            .run_step(&step, &exception, 1, &"TENANT_A".into(), &tenant, &pack, &gates, true)
            .await;
        assert_eq!(outcome.status, StepStatus::NeedsApproval);
        assert!(outcome.reason.unwrap().contains("CRITICAL"));
    }

    #[tokio::test]
    async fn tool_not_allow_listed_halts_via_rollback() {
        let executor = FakeExecutor { fail_tools: vec![] };
        let audit = RecordingAuditSink::default();
        let engine = ExecutionEngine::new(&executor, &audit);
        let pack = domain_pack(&["triggerSettlementRetry", "rollback"]);
        let tenant = tenant_policy(&["rollback"]);
        let exception = exception_with("ORD-1");
        let step = PlaybookStep::new("triggerSettlementRetry('{{orderId}}')");
        let gates = GateInputs {
            policy_is_actionable_approved: true,
            severity: Severity::High,
            human_approval_rules: &[],
            confidence: 0.95,
            guardrails: &Guardrails {
                human_approval_threshold: 0.5,
                ..Guardrails::default()
            },
        };
        let outcome = engine
            .run_step(&step, &exception, 1, &"TENANT_A".into(), &tenant, &pack, &gates, true)
            .await;
        assert_eq!(outcome.status, StepStatus::Failed);
        assert!(outcome.rollback_attempted);
        assert!(!outcome.escalation_attempted);
    }

    #[tokio::test]
    async fn tool_not_allow_listed_without_rollback_escalates() {
        let executor = FakeExecutor { fail_tools: vec![] };
        let audit = RecordingAuditSink::default();
        let engine = ExecutionEngine::new(&executor, &audit);
        let pack = domain_pack(&["triggerSettlementRetry", "escalate"]);
        let tenant = tenant_policy(&["escalate"]);
        let exception = exception_with("ORD-1");
        let step = PlaybookStep::new("triggerSettlementRetry('{{orderId}}')");
        let gates = GateInputs {
            policy_is_actionable_approved: true,
            severity: Severity::High,
            human_approval_rules: &[],
            confidence: 0.95,
            guardrails: &Guardrails {
                human_approval_threshold: 0.5,
                ..Guardrails::default()
            },
        };
        let outcome = engine
            .run_step(&step, &exception, 1, &"TENANT_A".into(), &tenant, &pack, &gates, true)
            .await;
        assert_eq!(outcome.status, StepStatus::Failed);
        assert!(!outcome.rollback_attempted);
        assert!(outcome.escalation_attempted);
    }

    #[tokio::test]
    async fn failure_attempts_rollback_then_halts() {
        let executor = FakeExecutor {
            fail_tools: vec!["triggerSettlementRetry"],
        };
        let audit = RecordingAuditSink::default();
        let engine = ExecutionEngine::new(&executor, &audit);
        let pack = domain_pack(&["triggerSettlementRetry", "rollback"]);
        let tenant = tenant_policy(&["triggerSettlementRetry", "rollback"]);
        let exception = exception_with("ORD-1");
        let step = PlaybookStep::new("triggerSettlementRetry('{{orderId}}')");
        let gates = GateInputs {
            policy_is_actionable_approved: true,
            severity: Severity::High,
            human_approval_rules: &[],
            confidence: 0.95,
            guardrails: &Guardrails {
                human_approval_threshold: 0.5,
                ..Guardrails::default()
            },
        };
        let outcome = engine
            .run_step(&step, &exception, 1, &"TENANT_A".into(), &tenant, &pack, &gates, true)
            .await;
        assert_eq!(outcome.status, StepStatus::Failed);
        assert!(outcome.rollback_attempted);
        assert!(!outcome.escalation_attempted);
    }

    #[tokio::test]
    async fn rollback_failure_also_attempts_escalation() {
        let executor = FakeExecutor {
            fail_tools: vec!["triggerSettlementRetry", "rollback"],
        };
        let audit = RecordingAuditSink::default();
        let engine = ExecutionEngine::new(&executor, &audit);
        let pack = domain_pack(&["triggerSettlementRetry", "rollback", "escalate"]);
        let tenant = tenant_policy(&["triggerSettlementRetry", "rollback", "escalate"]);
        let exception = exception_with("ORD-1");
        let step = PlaybookStep::new("triggerSettlementRetry('{{orderId}}')");
        let gates = GateInputs {
            policy_is_actionable_approved: true,
            severity: Severity::High,
            human_approval_rules: &[],
            confidence: 0.95,
            guardrails: &Guardrails {
                human_approval_threshold: 0.5,
                ..Guardrails::default()
            },
        };
        let outcome = engine
            .run_step(&step, &exception, 1, &"TENANT_A".into(), &tenant, &pack, &gates, true)
            .await;
        assert_eq!(outcome.status, StepStatus::Failed);
        assert!(outcome.rollback_attempted);
        assert!(outcome.escalation_attempted);
    }

    #[tokio::test]
    async fn each_step_outcome_and_recovery_attempt_is_audited() {
        let executor = FakeExecutor {
            fail_tools: vec!["triggerSettlementRetry", "rollback"],
        };
        let audit = RecordingAuditSink::default();
        let engine = ExecutionEngine::new(&executor, &audit);
        let pack = domain_pack(&["triggerSettlementRetry", "rollback", "escalate"]);
        let tenant = tenant_policy(&["triggerSettlementRetry", "rollback", "escalate"]);
        let exception = exception_with("ORD-1");
        let step = PlaybookStep::new("triggerSettlementRetry('{{orderId}}')");
        let gates = GateInputs {
            policy_is_actionable_approved: true,
            severity: Severity::High,
            human_approval_rules: &[],
            confidence: 0.95,
            guardrails: &Guardrails {
                human_approval_threshold: 0.5,
                ..Guardrails::default()
            },
        };
        engine
            .run_step(&step, &exception, 1, &"TENANT_A".into(), &tenant, &pack, &gates, true)
            .await;

        let events = audit.events.lock().unwrap();
        let event_types: Vec<&str> = events.iter().map(|e| e.event_type.as_str()).collect();
        assert!(event_types.contains(&"step_rollback"));
        assert!(event_types.contains(&"step_escalate"));
        assert!(event_types.contains(&"step_execution_completed"));
        assert!(events.iter().all(|e| e.exception_id.is_some() && e.tenant_id.is_some()));
    }

    #[test]
    fn unresolved_placeholder_is_reported() {
        let exception = exception_with("ORD-1");
        let (resolved, unresolved) = resolve_placeholders("ref {{missingKey}}", &exception);
        assert_eq!(resolved, "ref {{missingKey}}");
        assert_eq!(unresolved, vec!["missingKey".to_string()]);
    }

    #[test]
    fn resolved_placeholder_substitutes_value() {
        let exception = exception_with("ORD-1");
        let (resolved, unresolved) = resolve_placeholders("order {{orderId}}", &exception);
        assert_eq!(resolved, "order ORD-1");
        assert!(unresolved.is_empty());
    }
}
