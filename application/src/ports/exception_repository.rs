//! Exception repository port: persistence is the source of
//! truth for an exception record. Concurrent workers synchronize through
//! the event log and this repository rather than by holding the record in
//! memory across turns — the repository is the single writer per turn.

use async_trait::async_trait;
use exception_platform_domain::{ExceptionId, ExceptionRecord, TenantId};

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("exception not found: tenant={tenant_id} id={exception_id}")]
    NotFound { tenant_id: String, exception_id: String },
}

/// Persists and retrieves exception records, scoped by tenant. No lookup
/// may cross a tenant boundary: implementations must
/// key storage by `(tenant_id, exception_id)`, never by `exception_id`
/// alone.
#[async_trait]
pub trait ExceptionRepository: Send + Sync {
    async fn save(&self, record: &ExceptionRecord) -> Result<(), RepositoryError>;

    async fn get(&self, tenant_id: &TenantId, exception_id: &ExceptionId) -> Result<ExceptionRecord, RepositoryError>;
}
