//! Metric names, one-time descriptions, and the optional Prometheus exporter.

use std::net::SocketAddr;

use anyhow::Context;
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::OnceCell;

pub const RUNS_TOTAL: &str = "narrative_runs_total";
pub const RUN_MS: &str = "narrative_run_ms";
pub const OVERALL_SCORE: &str = "narrative_overall_score";
pub const COMPONENT_SCORE: &str = "narrative_component_score";
pub const COMPONENT_ZERO_TOTAL: &str = "narrative_component_zero_total";
pub const UPSTREAM_ERRORS_TOTAL: &str = "upstream_fetch_errors_total";
pub const STICKY_ADDED_TOTAL: &str = "sticky_signals_added_total";
pub const STICKY_PRUNED_TOTAL: &str = "sticky_signals_pruned_total";
pub const STORE_WRITE_ERRORS_TOTAL: &str = "store_write_errors_total";

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(RUNS_TOTAL, "Completed aggregation runs.");
        describe_histogram!(RUN_MS, "Aggregation run time in milliseconds.");
        describe_gauge!(OVERALL_SCORE, "Latest composite narrative score (0-100).");
        describe_gauge!(COMPONENT_SCORE, "Latest per-component score (0-100).");
        describe_counter!(
            COMPONENT_ZERO_TOTAL,
            "Component results zeroed because upstream data was missing."
        );
        describe_counter!(UPSTREAM_ERRORS_TOTAL, "Upstream fetch/parse failures.");
        describe_counter!(STICKY_ADDED_TOTAL, "Sticky signals inserted.");
        describe_counter!(STICKY_PRUNED_TOTAL, "Sticky signals removed by expiry cleanup.");
        describe_counter!(
            STORE_WRITE_ERRORS_TOTAL,
            "Store writes that could not be persisted."
        );
    });
}

/// Install the Prometheus recorder with its own HTTP listener on `addr`.
/// Must be called from inside a Tokio runtime.
pub fn install_prometheus(addr: SocketAddr) -> anyhow::Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .with_context(|| format!("installing prometheus exporter on {addr}"))?;
    ensure_metrics_described();
    tracing::info!(%addr, "prometheus exporter listening");
    Ok(())
}
