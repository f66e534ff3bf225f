//! In-memory `FeedbackStore`: durable per-`(tenant,
//! exception_type)` outcome counts the Feedback stage reasons over.

use exception_platform_application::ports::{FeedbackStore, ObservationCounts};
use exception_platform_domain::TenantId;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
pub struct InMemoryFeedbackStore {
    table: Mutex<HashMap<(TenantId, String), ObservationCounts>>,
}

impl InMemoryFeedbackStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FeedbackStore for InMemoryFeedbackStore {
    fn record(&self, tenant_id: &TenantId, exception_type: &str, was_false_positive: bool, was_false_negative: bool) -> ObservationCounts {
        let mut table = self.table.lock().unwrap();
        let entry = table.entry((tenant_id.clone(), exception_type.to_string())).or_default();
        entry.total += 1;
        if was_false_positive {
            entry.false_positive += 1;
        }
        if was_false_negative {
            entry.false_negative += 1;
        }
        *entry
    }

    fn counts(&self, tenant_id: &TenantId, exception_type: &str) -> ObservationCounts {
        self.table.lock().unwrap().get(&(tenant_id.clone(), exception_type.to_string())).copied().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_accumulate_per_tenant_and_exception_type() {
        let store = InMemoryFeedbackStore::new();
        let tenant: TenantId = "TENANT_A".into();

        store.record(&tenant, "SETTLEMENT_FAIL", true, false);
        let counts = store.record(&tenant, "SETTLEMENT_FAIL", false, true);

        assert_eq!(counts.total, 2);
        assert_eq!(counts.false_positive, 1);
        assert_eq!(counts.false_negative, 1);
    }

    #[test]
    fn distinct_tenants_do_not_share_counts() {
        let store = InMemoryFeedbackStore::new();
        store.record(&"TENANT_A".into(), "SETTLEMENT_FAIL", true, false);
        let counts = store.counts(&"TENANT_B".into(), "SETTLEMENT_FAIL");
        assert_eq!(counts.total, 0);
    }
}
