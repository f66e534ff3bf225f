//! Feedback observation store port: durable per-`(tenant,
//! exception_type)` outcome counts the Feedback stage reasons over. The
//! aggregation itself — incrementing counts as cases resolve — is the
//! store's job; the stage only reads a snapshot and decides whether a
//! recommendation is warranted.

use exception_platform_domain::TenantId;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObservationCounts {
    pub total: u64,
    pub false_positive: u64,
    pub false_negative: u64,
}

/// Tracks outcome counts scoped by tenant and exception type.
pub trait FeedbackStore: Send + Sync {
    /// Records one resolved case and returns the updated counts for that
    /// `(tenant, exception_type)` pair.
    fn record(
        &self,
        tenant_id: &TenantId,
        exception_type: &str,
        was_false_positive: bool,
        was_false_negative: bool,
    ) -> ObservationCounts;

    fn counts(&self, tenant_id: &TenantId, exception_type: &str) -> ObservationCounts;
}
