//! A `tracing`-backed [`MetricsSink`]: emits the three
//! routing-fabric counters/histogram as structured `tracing` events
//! rather than wiring a Prometheus exporter directly, matching the
//! "metrics are optional and degradable" posture — a real deployment
//! would scrape these events or swap this sink for one that speaks
//! Prometheus, without the application layer noticing the difference.

use exception_platform_application::ports::MetricsSink;

pub struct TracingMetricsSink;

impl MetricsSink for TracingMetricsSink {
    fn record_provider_selection(&self, tenant_id: &str, domain: &str, provider: &str, model: &str) {
        tracing::info!(
            metric = "llm_provider_selection_total",
            tenant_id,
            domain,
            provider,
            model,
            "provider selected"
        );
    }

    fn record_fallback_event(&self, tenant_id: &str, domain: &str, from_provider: &str, to_provider: &str) {
        tracing::warn!(
            metric = "llm_fallback_events_total",
            tenant_id,
            domain,
            from_provider,
            to_provider,
            "provider fallback"
        );
    }

    fn record_routing_latency(&self, tenant_id: &str, domain: &str, seconds: f64) {
        tracing::debug!(
            metric = "llm_routing_decision_seconds",
            tenant_id,
            domain,
            seconds,
            "routing decision latency"
        );
    }
}
