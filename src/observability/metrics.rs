//! Metrics collection and exposition.
//!
//! # Metrics
//! - `vanity_requests_total` (counter): requests by action and render outcome
//! - `vanity_request_duration_seconds` (histogram): render latency
//! - `vanity_reloads_total` (counter): source loads by store and outcome
//!
//! Recording is a no-op until [`init_metrics`] installs the exporter.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint started"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to start metrics endpoint"),
    }
}

/// Record a served page.
pub fn record_request(action: Option<&'static str>, rendered: bool, start: Instant) {
    let action = action.unwrap_or("Generic");
    let outcome = if rendered { "ok" } else { "render_error" };
    counter!("vanity_requests_total", "action" => action, "outcome" => outcome).increment(1);
    histogram!("vanity_request_duration_seconds", "action" => action)
        .record(start.elapsed().as_secs_f64());
}

/// Record a load attempt for `store`.
pub fn record_reload(store: &'static str, success: bool) {
    let outcome = if success { "success" } else { "failure" };
    counter!("vanity_reloads_total", "store" => store, "outcome" => outcome).increment(1);
}
