//! Prometheus wiring: recorder install, series registration, /metrics route.

use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
pub fn describe_metrics() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "synergy_fetch_errors_total",
            "Upstream fetch failures (round or schedule granularity)."
        );
        describe_counter!(
            "synergy_rounds_skipped_total",
            "Rounds skipped: testing events, future dates, failed fetches."
        );
        describe_counter!(
            "synergy_rounds_processed_total",
            "Rounds whose session data reached the extractor."
        );
        describe_counter!(
            "synergy_recompute_runs_total",
            "Completed weight-update recompute runs."
        );
        describe_gauge!("synergy_raw_records", "Rows currently in the raw table.");
    });
}

pub struct Telemetry {
    pub handle: PrometheusHandle,
}

impl Telemetry {
    /// Initialize the Prometheus recorder. Call once at startup.
    pub fn init() -> Self {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .expect("prometheus: install recorder");
        describe_metrics();
        Self { handle }
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
