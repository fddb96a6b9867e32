//! Metrics collection and exposition.
//!
//! # Metrics
//! - `trigger_requests_total` (counter): requests by terminal outcome
//! - `trigger_rate_limited_total` (counter): admissions denied
//! - `audit_write_failures_total` (counter): failed log appends
//! - `trigger_action_duration_seconds` (histogram): reboot command runtime
//!
//! Recording is a no-op until [`init_metrics`] installs the exporter.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Count a request by how it ended (`dropped_*`, `success`, `failed`, `unsupported`).
pub fn record_outcome(outcome: &'static str) {
    metrics::counter!("trigger_requests_total", "outcome" => outcome).increment(1);
}

pub fn record_rate_limited() {
    metrics::counter!("trigger_rate_limited_total").increment(1);
}

pub fn record_audit_failure() {
    metrics::counter!("audit_write_failures_total").increment(1);
}

pub fn record_action_duration(started: Instant) {
    metrics::histogram!("trigger_action_duration_seconds").record(started.elapsed().as_secs_f64());
}
