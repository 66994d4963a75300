// Prometheus metrics definitions for the build finder service.

use lazy_static::lazy_static;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // ── Gauges ───────────────────────────────────────────────────────

    /// Optimize requests currently running.
    pub static ref OPTIMIZATIONS_IN_FLIGHT: IntGauge =
        IntGauge::new("buildfinder_optimizations_in_flight", "Optimize requests currently running").unwrap();

    /// Cards in the loaded catalog.
    pub static ref CATALOG_CARDS: IntGauge =
        IntGauge::new("buildfinder_catalog_cards", "Cards in the loaded catalog").unwrap();

    /// Items in the loaded catalog.
    pub static ref CATALOG_ITEMS: IntGauge =
        IntGauge::new("buildfinder_catalog_items", "Items in the loaded catalog").unwrap();

    // ── Counters ─────────────────────────────────────────────────────

    /// Optimize requests by outcome (ok, empty, not_found, bad_request, infeasible, cancelled, error).
    pub static ref OPTIMIZE_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("buildfinder_optimize_requests_total", "Total optimize requests"),
        &["outcome"],
    )
    .unwrap();

    /// Token/trait distributions scored across all searches.
    pub static ref DISTRIBUTIONS_EVALUATED_TOTAL: IntCounter = IntCounter::new(
        "buildfinder_distributions_evaluated_total",
        "Distributions scored by the character search",
    )
    .unwrap();

    // ── Histograms ───────────────────────────────────────────────────

    /// Optimize request duration in seconds.
    pub static ref OPTIMIZE_DURATION_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new("buildfinder_optimize_duration_seconds", "Optimize request duration in seconds")
            .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
    )
    .unwrap();

    /// Tied builds returned per successful request.
    pub static ref BUILDS_RETURNED: Histogram = Histogram::with_opts(
        HistogramOpts::new("buildfinder_builds_returned", "Tied builds returned per request")
            .buckets(vec![0.0, 1.0, 2.0, 4.0, 8.0, 16.0, 64.0, 256.0]),
    )
    .unwrap();
}

/// Register all metrics with the custom registry. Call once at startup.
pub fn register_metrics() {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(OPTIMIZATIONS_IN_FLIGHT.clone()),
        Box::new(CATALOG_CARDS.clone()),
        Box::new(CATALOG_ITEMS.clone()),
        Box::new(OPTIMIZE_REQUESTS_TOTAL.clone()),
        Box::new(DISTRIBUTIONS_EVALUATED_TOTAL.clone()),
        Box::new(OPTIMIZE_DURATION_SECONDS.clone()),
        Box::new(BUILDS_RETURNED.clone()),
    ];

    for c in collectors {
        // Re-registration (e.g. from tests) is harmless.
        if let Err(e) = REGISTRY.register(c) {
            tracing::debug!("metric already registered: {e}");
        }
    }
}

/// Serialize all registered metrics to the Prometheus text exposition format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {e}");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gather_metrics_returns_string() {
        register_metrics();
        register_metrics();
        let output = gather_metrics();
        assert!(output.is_empty() || output.contains("buildfinder_"));
    }

    #[test]
    fn test_metric_increments() {
        OPTIMIZATIONS_IN_FLIGHT.inc();
        OPTIMIZATIONS_IN_FLIGHT.dec();

        CATALOG_CARDS.set(12);
        assert_eq!(CATALOG_CARDS.get(), 12);

        OPTIMIZE_REQUESTS_TOTAL.with_label_values(&["ok"]).inc();
        DISTRIBUTIONS_EVALUATED_TOTAL.inc_by(40);
        OPTIMIZE_DURATION_SECONDS.observe(0.2);
        BUILDS_RETURNED.observe(4.0);
    }
}
