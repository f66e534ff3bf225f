//! The exception record — the process-lifetime entity driven through the
//! pipeline.

use crate::ids::{DomainName, ExceptionId, TenantId};
use crate::value::DynValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExceptionStatus {
    Open,
    Analyzing,
    Resolved,
    Escalated,
    NeedsApproval,
}

/// An operational exception moving through Triage → Policy → Resolution →
/// Supervisor → Feedback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExceptionRecord {
    pub exception_id: ExceptionId,
    pub tenant_id: TenantId,
    pub source_system: String,
    pub domain: DomainName,
    pub created_at: DateTime<Utc>,

    pub exception_type: Option<String>,
    pub severity: Option<Severity>,

    pub status: ExceptionStatus,
    pub current_playbook_id: Option<String>,
    pub current_step: u32,

    pub raw_payload: DynValue,
    pub normalized_context: DynValue,

    pub sla_deadline: Option<DateTime<Utc>>,
    pub owner: Option<String>,
    pub amount: Option<f64>,
}

impl ExceptionRecord {
    pub fn new(
        exception_id: impl Into<ExceptionId>,
        tenant_id: impl Into<TenantId>,
        source_system: impl Into<String>,
        domain: impl Into<DomainName>,
        created_at: DateTime<Utc>,
        raw_payload: DynValue,
    ) -> Self {
        Self {
            exception_id: exception_id.into(),
            tenant_id: tenant_id.into(),
            source_system: source_system.into(),
            domain: domain.into(),
            created_at,
            exception_type: None,
            severity: None,
            status: ExceptionStatus::Open,
            current_playbook_id: None,
            current_step: 0,
            raw_payload,
            normalized_context: DynValue::object(),
            sla_deadline: None,
            owner: None,
            amount: None,
        }
    }

    /// Look up a value first in `normalized_context`, falling back to
    /// `raw_payload`, matching the placeholder-resolution precedence used by
    /// the execution engine.
    pub fn lookup_context(&self, key: &str) -> Option<&DynValue> {
        self.normalized_context
            .get(key)
            .or_else(|| self.raw_payload.get(key))
    }

    pub fn advance_step(&mut self) {
        self.current_step += 1;
    }

    pub fn is_critical(&self) -> bool {
        self.severity == Some(Severity::Critical)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ExceptionRecord {
        let mut payload = DynValue::object();
        payload.set("orderId", DynValue::String("ORD-123".into()));
        ExceptionRecord::new("EX-001", "TENANT_A", "settlement-svc", "Finance", Utc::now(), payload)
    }

    #[test]
    fn lookup_context_falls_back_to_raw_payload() {
        let rec = sample();
        assert_eq!(
            rec.lookup_context("orderId").and_then(|v| v.as_str()),
            Some("ORD-123")
        );
    }

    #[test]
    fn normalized_context_shadows_raw_payload() {
        let mut rec = sample();
        rec.normalized_context.set("orderId", DynValue::String("OVERRIDE".into()));
        assert_eq!(
            rec.lookup_context("orderId").and_then(|v| v.as_str()),
            Some("OVERRIDE")
        );
    }

    #[test]
    fn advance_step_increments_by_one() {
        let mut rec = sample();
        assert_eq!(rec.current_step, 0);
        rec.advance_step();
        rec.advance_step();
        assert_eq!(rec.current_step, 2);
    }

    #[test]
    fn is_critical_checks_severity() {
        let mut rec = sample();
        assert!(!rec.is_critical());
        rec.severity = Some(Severity::Critical);
        assert!(rec.is_critical());
    }
}
