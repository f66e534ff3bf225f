//! Tool invoker: maps a tool name to its Domain Pack
//! endpoint definition and invokes it, defaulting to a dry-run mode that
//! never performs the real side effect — the MVP default.

use async_trait::async_trait;
use exception_platform_application::ports::{ToolExecutorPort, ToolInvocationError, ToolInvocationResult};
use exception_platform_domain::{DomainPack, DynValue, TenantId, TenantPolicyPack};

/// Invokes tools declared in a Domain Pack. When `dry_run` is `true` (the
/// default posture), no network call is made: a deterministic synthetic
/// result is returned instead, tagged `dry_run: true`.
pub struct DryRunToolExecutor {
    client: reqwest::Client,
}

impl DryRunToolExecutor {
    pub fn new() -> Self {
        Self { client: reqwest::Client::new() }
    }
}

impl Default for DryRunToolExecutor {
    fn default() -> Self {
        Self::new()
    }
}

fn synthetic_output(tool_name: &str, args: &DynValue) -> DynValue {
    let mut output = DynValue::object();
    output.set("tool", DynValue::String(tool_name.to_string()));
    output.set("status", DynValue::String("simulated".to_string()));
    output.set("args_echo", args.clone());
    output.set("dry_run", DynValue::Bool(true));
    output
}

#[async_trait]
impl ToolExecutorPort for DryRunToolExecutor {
    async fn invoke(
        &self,
        tool_name: &str,
        args: &DynValue,
        _tenant_id: &TenantId,
        tenant_policy: &TenantPolicyPack,
        domain_pack: &DomainPack,
        dry_run: bool,
    ) -> Result<ToolInvocationResult, ToolInvocationError> {
        if !self.is_allowed(domain_pack, tenant_policy, tool_name) {
            return Err(ToolInvocationError {
                tool_name: tool_name.to_string(),
                attempts: 0,
                last_error: "tool is not allowed for this tenant/domain combination".to_string(),
            });
        }

        let Some(tool) = domain_pack.tool(tool_name) else {
            return Err(ToolInvocationError {
                tool_name: tool_name.to_string(),
                attempts: 0,
                last_error: "tool not declared in domain pack".to_string(),
            });
        };

        if dry_run {
            return Ok(ToolInvocationResult {
                tool_name: tool_name.to_string(),
                output: synthetic_output(tool_name, args),
                dry_run: true,
            });
        }

        let mut attempts = 0;
        let mut last_error = String::new();
        while attempts < tool.max_retries.max(1) {
            attempts += 1;
            let body = serde_json::Value::from(args.clone());
            match self.client.post(&tool.endpoint).json(&body).timeout(tool.timeout).send().await {
                Ok(response) if response.status().is_success() => {
                    let output: serde_json::Value = response.json().await.unwrap_or(serde_json::Value::Null);
                    return Ok(ToolInvocationResult {
                        tool_name: tool_name.to_string(),
                        output: DynValue::from(output),
                        dry_run: false,
                    });
                }
                Ok(response) => {
                    last_error = format!("tool endpoint returned status {}", response.status());
                }
                Err(err) => {
                    last_error = err.to_string();
                }
            }
        }

        Err(ToolInvocationError { tool_name: tool_name.to_string(), attempts, last_error })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exception_platform_domain::pack::ToolDefinition;
    use exception_platform_domain::Guardrails;
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn pack_with_tool() -> DomainPack {
        let mut tools = BTreeMap::new();
        tools.insert(
            "getSettlement".to_string(),
            ToolDefinition {
                description: "look up a settlement".into(),
                endpoint: "https://example.test/settlement".into(),
                parameter_schema: serde_json::json!({}),
                version: "1".into(),
                timeout: Duration::from_secs(5),
                max_retries: 1,
            },
        );
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

    #[tokio::test]
    async fn dry_run_returns_synthetic_result_without_a_network_call() {
        let executor = DryRunToolExecutor::new();
        let pack = pack_with_tool();
        let tenant = tenant_policy(&["getSettlement"]);
        let result = executor
            .invoke("getSettlement", &DynValue::object(), &"TENANT_A".into(), &tenant, &pack, true)
            .await
            .unwrap();
        assert!(result.dry_run);
        assert_eq!(result.tool_name, "getSettlement");
    }

    #[tokio::test]
    async fn unapproved_tool_is_rejected_before_any_lookup() {
        let executor = DryRunToolExecutor::new();
        let pack = pack_with_tool();
        let tenant = tenant_policy(&[]);
        let result = executor.invoke("getSettlement", &DynValue::object(), &"TENANT_A".into(), &tenant, &pack, true).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn undeclared_tool_is_rejected() {
        let executor = DryRunToolExecutor::new();
        let pack = pack_with_tool();
        let tenant = tenant_policy(&["rollback"]);
        let result = executor.invoke("rollback", &DynValue::object(), &"TENANT_A".into(), &tenant, &pack, true).await;
        assert!(result.is_err());
    }
}
