//! Guardrail value objects shared by Domain Packs and Tenant Policy Packs.

use crate::exception::Severity;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Allow/block lists plus the confidence floor under which human approval
/// is required.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Guardrails {
    #[serde(default)]
    pub allow_list: Vec<String>,
    #[serde(default)]
    pub block_list: Vec<String>,
    pub human_approval_threshold: f64,
}

impl Default for Guardrails {
    fn default() -> Self {
        Self {
            allow_list: Vec::new(),
            block_list: Vec::new(),
            human_approval_threshold: 0.7,
        }
    }
}

/// An ordered rule: does the given severity require human approval?
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HumanApprovalRule {
    pub severity: Severity,
    pub require_approval: bool,
}

/// Tenant overlay on domain guardrails (Tenant Policy Pack
/// `custom_guardrails`).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CustomGuardrails {
    pub allow_list: Option<Vec<String>>,
    pub block_list: Option<Vec<String>>,
    pub human_approval_threshold: Option<f64>,
}

impl Guardrails {
    /// Apply a tenant's optional overrides, producing the effective
    /// guardrails used by the execution engine.
    pub fn with_overrides(&self, overrides: Option<&CustomGuardrails>) -> Guardrails {
        let Some(o) = overrides else {
            return self.clone();
        };
        Guardrails {
            allow_list: o.allow_list.clone().unwrap_or_else(|| self.allow_list.clone()),
            block_list: o.block_list.clone().unwrap_or_else(|| self.block_list.clone()),
            human_approval_threshold: o
                .human_approval_threshold
                .unwrap_or(self.human_approval_threshold),
        }
    }
}

/// Finds the applicable rule for a severity, returning `false` (no approval
/// required) if no rule matches the given severity.
pub fn requires_approval(rules: &[HumanApprovalRule], severity: Severity) -> bool {
    rules
        .iter()
        .find(|r| r.severity == severity)
        .map(|r| r.require_approval)
        .unwrap_or(false)
}

pub type SeverityOverrides = BTreeMap<String, Severity>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_falls_back_to_domain_default() {
        let base = Guardrails {
            allow_list: vec!["getSettlement".into()],
            block_list: vec![],
            human_approval_threshold: 0.8,
        };
        let effective = base.with_overrides(None);
        assert_eq!(effective.human_approval_threshold, 0.8);
    }

    #[test]
    fn override_replaces_threshold_only() {
        let base = Guardrails {
            allow_list: vec!["a".into()],
            block_list: vec![],
            human_approval_threshold: 0.8,
        };
        let overrides = CustomGuardrails {
            allow_list: None,
            block_list: None,
            human_approval_threshold: Some(0.5),
        };
        let effective = base.with_overrides(Some(&overrides));
        assert_eq!(effective.human_approval_threshold, 0.5);
        assert_eq!(effective.allow_list, vec!["a".to_string()]);
    }

    #[test]
    fn requires_approval_defaults_false_when_no_rule_matches() {
        let rules = vec![HumanApprovalRule {
            severity: Severity::High,
            require_approval: true,
        }];
        assert!(!requires_approval(&rules, Severity::Medium));
        assert!(requires_approval(&rules, Severity::High));
    }
}
