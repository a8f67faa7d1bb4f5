//! Prometheus metrics.

use metrics::{describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and describe the metrics this service
/// emits. Returns the handle used to render `/metrics`.
pub fn init_metrics() -> PrometheusHandle {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    describe_counter!(
        "vidnote_items_submitted_total",
        "Items accepted for processing"
    );
    describe_counter!(
        "vidnote_runs_completed_total",
        "Pipeline runs that reached completed"
    );
    describe_counter!(
        "vidnote_runs_failed_total",
        "Pipeline runs that reached error"
    );
    describe_counter!(
        "vidnote_transcription_cache_hits_total",
        "Transcriptions served from the sidecar cache"
    );
    describe_gauge!(
        "vidnote_ws_active_connections",
        "Currently open WebSocket connections"
    );

    handle
}

/// Record the current number of open WebSocket connections.
pub fn set_ws_active_connections(count: i64) {
    gauge!("vidnote_ws_active_connections").set(count as f64);
}
