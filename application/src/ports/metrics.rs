//! Metrics port. Degradable: the no-op implementation in
//! `infrastructure::llm::metrics` is used whenever no real metrics backend
//! is wired, matching the optional-Prometheus pattern in the source
//! lineage's `metrics.py`.

/// Normalizes an optional label value to `"unknown"`, :
/// "Label values of null are normalized to the literal 'unknown'."
pub fn normalize_label(value: Option<&str>) -> &str {
    value.unwrap_or("unknown")
}

pub trait MetricsSink: Send + Sync {
    fn record_provider_selection(&self, tenant_id: &str, domain: &str, provider: &str, model: &str);
    fn record_fallback_event(&self, tenant_id: &str, domain: &str, from_provider: &str, to_provider: &str);
    fn record_routing_latency(&self, tenant_id: &str, domain: &str, seconds: f64);
}

/// No-op implementation used when no metrics backend is configured.
pub struct NoopMetricsSink;

impl MetricsSink for NoopMetricsSink {
    fn record_provider_selection(&self, _tenant_id: &str, _domain: &str, _provider: &str, _model: &str) {}
    fn record_fallback_event(&self, _tenant_id: &str, _domain: &str, _from_provider: &str, _to_provider: &str) {}
    fn record_routing_latency(&self, _tenant_id: &str, _domain: &str, _seconds: f64) {}
}
