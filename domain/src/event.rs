//! The canonical event envelope and the closed event-type set.

use crate::ids::{EventId, ExceptionId, TenantId};
use crate::value::DynValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    ExceptionIngested,
    TriageCompleted,
    PolicyEvaluated,
    PlaybookMatched,
    StepExecutionRequested,
    StepExecutionCompleted,
    ResolutionCompleted,
    FallbackOccurred,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalEvent {
    pub event_id: EventId,
    pub event_type: EventType,
    pub tenant_id: TenantId,
    /// Equal to the originating exception's id for the lifetime of that
    /// exception.
    pub correlation_id: ExceptionId,
    pub timestamp: DateTime<Utc>,
    pub payload: DynValue,
}

impl CanonicalEvent {
    pub fn new(
        event_id: impl Into<EventId>,
        event_type: EventType,
        tenant_id: impl Into<TenantId>,
        correlation_id: impl Into<ExceptionId>,
        timestamp: DateTime<Utc>,
        payload: DynValue,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            event_type,
            tenant_id: tenant_id.into(),
            correlation_id: correlation_id.into(),
            timestamp,
            payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correlation_id_matches_exception() {
        let ev = CanonicalEvent::new(
            "E1",
            EventType::PlaybookMatched,
            "TENANT_A",
            "EX-100",
            Utc::now(),
            DynValue::object(),
        );
        assert_eq!(ev.correlation_id.as_str(), "EX-100");
    }
}
