//! Domain Pack and Tenant Policy Pack value objects.

mod domain_pack;
mod guardrails;
mod tenant_policy;

pub use domain_pack::{DomainPack, ExceptionTypeDefinition, ToolDefinition};
pub use guardrails::{requires_approval, CustomGuardrails, Guardrails, HumanApprovalRule, SeverityOverrides};
pub use tenant_policy::TenantPolicyPack;

/// A per-field validation failure or warning surfaced at pack ingest
///.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Structured pass/fail report produced when a pack is registered.
#[derive(Debug, Clone, Default)]
pub struct PackValidationReport {
    pub errors: Vec<FieldError>,
    pub warnings: Vec<FieldError>,
}

impl PackValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validates cross-references within a Domain Pack: every playbook must
/// reference a declared exception type, and every step's extracted tool
/// (if any) must be declared in the pack's tools.
pub fn validate_domain_pack(pack: &DomainPack) -> PackValidationReport {
    let mut report = PackValidationReport::default();

    for playbook in &pack.playbooks {
        if !pack.exception_types.is_empty() && !pack.exception_types.contains_key(&playbook.exception_type) {
            report.warnings.push(FieldError::new(
                format!("playbooks[{}].exceptionType", playbook.exception_type),
                "references an exception type not declared in exception_types",
            ));
        }
        for step in &playbook.steps {
            if let Some(tool_name) = step.extract_tool_name() {
                if !pack.has_tool(tool_name) {
                    report.errors.push(FieldError::new(
                        format!("playbooks[{}].steps", playbook.exception_type),
                        format!("references undeclared tool '{}'", tool_name),
                    ));
                }
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playbook::{Playbook, PlaybookStep};
    use std::collections::BTreeMap;

    #[test]
    fn rejects_playbook_referencing_undeclared_tool() {
        let pack = DomainPack {
            domain_name: "Finance".into(),
            version: "1.0.0".into(),
            exception_types: BTreeMap::new(),
            tools: BTreeMap::new(),
            playbooks: vec![Playbook {
                exception_type: "SETTLEMENT_FAIL".into(),
                steps: vec![PlaybookStep::new("getSettlement('ORD-123')")],
            }],
            guardrails: Guardrails::default(),
        };
        let report = validate_domain_pack(&pack);
        assert!(!report.is_valid());
        assert_eq!(report.errors.len(), 1);
    }
}
