//! Tool invocation port: maps tool name → endpoint/args,
//! enforces per-tenant allow-listing at the call site, supports dry-run.

use async_trait::async_trait;
use exception_platform_domain::{DomainPack, DynValue, TenantId, TenantPolicyPack};

#[derive(Debug, Clone)]
pub struct ToolInvocationError {
    pub tool_name: String,
    pub attempts: u32,
    pub last_error: String,
}

impl std::fmt::Display for ToolInvocationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "tool '{}' failed after {} attempt(s): {}",
            self.tool_name, self.attempts, self.last_error
        )
    }
}
impl std::error::Error for ToolInvocationError {}

#[derive(Debug, Clone)]
pub struct ToolInvocationResult {
    pub tool_name: String,
    pub output: DynValue,
    pub dry_run: bool,
}

/// Port for invoking a tool reachable by the active Domain Pack / Tenant
/// Policy Pack. Implementations live in `infrastructure::tools`.
#[async_trait]
pub trait ToolExecutorPort: Send + Sync {
    /// `is_allowed` iff the tool exists in `domain.tools` AND in
    /// `tenant_policy.approved_tools`.
    fn is_allowed(&self, domain: &DomainPack, tenant_policy: &TenantPolicyPack, tool: &str) -> bool {
        domain.has_tool(tool) && tenant_policy.approves(tool)
    }

    async fn invoke(
        &self,
        tool_name: &str,
        args: &DynValue,
        tenant_id: &TenantId,
        tenant_policy: &TenantPolicyPack,
        domain_pack: &DomainPack,
        dry_run: bool,
    ) -> Result<ToolInvocationResult, ToolInvocationError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use exception_platform_domain::Guardrails;
    use std::collections::BTreeMap;

    #[test]
    fn is_allowed_requires_both_domain_and_tenant_membership() {
        struct Fake;
        #[async_trait::async_trait]
        impl ToolExecutorPort for Fake {
            async fn invoke(
                &self,
                _tool_name: &str,
                _args: &DynValue,
                _tenant_id: &TenantId,
                _tenant_policy: &TenantPolicyPack,
                _domain_pack: &DomainPack,
                _dry_run: bool,
            ) -> Result<ToolInvocationResult, ToolInvocationError> {
                unreachable!()
            }
        }

        let mut tools = BTreeMap::new();
        tools.insert(
            "getSettlement".to_string(),
            exception_platform_domain::pack::ToolDefinition {
                description: "x".into(),
                endpoint: "/x".into(),
                parameter_schema: serde_json::json!({}),
                version: "1".into(),
                timeout: std::time::Duration::from_secs(1),
                max_retries: 1,
            },
        );
        let pack = DomainPack {
            domain_name: "Finance".into(),
            version: "1".into(),
            exception_types: BTreeMap::new(),
            tools,
            playbooks: vec![],
            guardrails: Guardrails::default(),
        };
        let tenant = TenantPolicyPack {
            tenant_id: "T".into(),
            domain_name: "Finance".into(),
            custom_guardrails: None,
            approved_tools: vec!["getSettlement".into()],
            human_approval_rules: vec![],
            custom_severity_overrides: None,
            custom_playbooks: vec![],
        };

        let executor = Fake;
        assert!(executor.is_allowed(&pack, &tenant, "getSettlement"));
        assert!(!executor.is_allowed(&pack, &tenant, "rollback"));
    }
}
