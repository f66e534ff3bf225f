//! Audit sink port: a write-only collaborator with a
//! single method, append a structured record.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use exception_platform_domain::{DynValue, ExceptionId, TenantId};

#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub event_type: String,
    pub tenant_id: Option<TenantId>,
    pub exception_id: Option<ExceptionId>,
    pub timestamp: DateTime<Utc>,
    pub data: DynValue,
}

impl AuditEvent {
    pub fn new(event_type: impl Into<String>, timestamp: DateTime<Utc>, data: DynValue) -> Self {
        Self {
            event_type: event_type.into(),
            tenant_id: None,
            exception_id: None,
            timestamp,
            data,
        }
    }

    pub fn for_exception(mut self, tenant_id: TenantId, exception_id: ExceptionId) -> Self {
        self.tenant_id = Some(tenant_id);
        self.exception_id = Some(exception_id);
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("failed to write audit record: {0}")]
    WriteFailed(String),
}

#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, event: AuditEvent) -> Result<(), AuditError>;
}
