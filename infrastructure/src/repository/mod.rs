//! In-memory `ExceptionRepository`: the single writer per
//! turn, keyed strictly by `(tenant_id, exception_id)` so no lookup can
//! cross a tenant boundary.

use async_trait::async_trait;
use exception_platform_application::ports::{ExceptionRepository, RepositoryError};
use exception_platform_domain::{ExceptionId, ExceptionRecord, TenantId};
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Default)]
pub struct InMemoryExceptionRepository {
    records: RwLock<HashMap<(TenantId, ExceptionId), ExceptionRecord>>,
}

impl InMemoryExceptionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ExceptionRepository for InMemoryExceptionRepository {
    async fn save(&self, record: &ExceptionRecord) -> Result<(), RepositoryError> {
        let key = (record.tenant_id.clone(), record.exception_id.clone());
        self.records.write().unwrap().insert(key, record.clone());
        Ok(())
    }

    async fn get(&self, tenant_id: &TenantId, exception_id: &ExceptionId) -> Result<ExceptionRecord, RepositoryError> {
        self.records
            .read()
            .unwrap()
            .get(&(tenant_id.clone(), exception_id.clone()))
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound {
                tenant_id: tenant_id.as_str().to_string(),
                exception_id: exception_id.as_str().to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exception_platform_domain::DynValue;

    fn exception() -> ExceptionRecord {
        ExceptionRecord::new("EX-001", "TENANT_A", "src", "Finance", chrono::Utc::now(), DynValue::object())
    }

    #[tokio::test]
    async fn save_then_get_round_trips() {
        let repository = InMemoryExceptionRepository::new();
        let record = exception();
        repository.save(&record).await.unwrap();
        let fetched = repository.get(&"TENANT_A".into(), &"EX-001".into()).await.unwrap();
        assert_eq!(fetched.exception_id, record.exception_id);
    }

    #[tokio::test]
    async fn lookups_never_cross_tenant_boundaries() {
        let repository = InMemoryExceptionRepository::new();
        repository.save(&exception()).await.unwrap();
        let result = repository.get(&"TENANT_B".into(), &"EX-001".into()).await;
        assert!(matches!(result, Err(RepositoryError::NotFound { .. })));
    }

    #[tokio::test]
    async fn unknown_exception_id_is_not_found() {
        let repository = InMemoryExceptionRepository::new();
        let result = repository.get(&"TENANT_A".into(), &"EX-404".into()).await;
        assert!(result.is_err());
    }
}
