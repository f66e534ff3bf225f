//! Tenant Policy Pack — tenant-scoped overlay on a Domain Pack.

use super::guardrails::{CustomGuardrails, HumanApprovalRule, SeverityOverrides};
use crate::ids::{DomainName, TenantId};
use crate::playbook::Playbook;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantPolicyPack {
    pub tenant_id: TenantId,
    pub domain_name: DomainName,
    #[serde(default)]
    pub custom_guardrails: Option<CustomGuardrails>,
    #[serde(default)]
    pub approved_tools: Vec<String>,
    #[serde(default)]
    pub human_approval_rules: Vec<HumanApprovalRule>,
    #[serde(default)]
    pub custom_severity_overrides: Option<SeverityOverrides>,
    #[serde(default)]
    pub custom_playbooks: Vec<Playbook>,
}

impl TenantPolicyPack {
    pub fn approves(&self, tool_name: &str) -> bool {
        self.approved_tools.iter().any(|t| t == tool_name)
    }

    pub fn approved_tools_set(&self) -> HashSet<&str> {
        self.approved_tools.iter().map(|s| s.as_str()).collect()
    }

    pub fn custom_playbook_for(&self, exception_type: &str) -> Option<&Playbook> {
        self.custom_playbooks
            .iter()
            .find(|p| p.exception_type == exception_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TenantPolicyPack {
        TenantPolicyPack {
            tenant_id: "TENANT_A".into(),
            domain_name: "Finance".into(),
            custom_guardrails: None,
            approved_tools: vec!["getSettlement".into(), "triggerSettlementRetry".into()],
            human_approval_rules: vec![],
            custom_severity_overrides: None,
            custom_playbooks: vec![],
        }
    }

    #[test]
    fn approves_checks_membership() {
        let tp = sample();
        assert!(tp.approves("getSettlement"));
        assert!(!tp.approves("rollback"));
    }
}
