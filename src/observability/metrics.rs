//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gate_requests_total` (counter): forwarded requests by method, status
//! - `gate_request_duration_seconds` (histogram): upstream round-trip latency
//! - `gate_rejections_total` (counter): requests stopped by the gate, by reason
//! - `gate_login_attempts_total` (counter): login attempts by gate, outcome
//! - `gate_rate_limit_tracked` (gauge): identifiers tracked per limiter
//! - `gate_upstream_errors_total` (counter): failed upstream calls
//!
//! Recording is a no-op until [`init_metrics`] installs the exporter.

use std::net::SocketAddr;
use std::sync::Once;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

static DESCRIBE: Once = Once::new();

/// Install the Prometheus exporter and serve `/metrics` on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    describe();
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

fn describe() {
    DESCRIBE.call_once(|| {
        describe_counter!("gate_requests_total", "Requests forwarded to the upstream");
        describe_histogram!(
            "gate_request_duration_seconds",
            "Upstream round-trip duration in seconds"
        );
        describe_counter!("gate_rejections_total", "Requests rejected by the gate");
        describe_counter!("gate_login_attempts_total", "Password login attempts");
        describe_gauge!(
            "gate_rate_limit_tracked",
            "Identifiers currently tracked by a rate limiter"
        );
        describe_counter!("gate_upstream_errors_total", "Failed upstream requests");
    });
}

/// Record a forwarded request.
pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(
        "gate_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("gate_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

/// Record a rejection (`path`, `cors`, `rate_limit`, `unauthenticated`).
pub fn record_rejection(reason: &'static str) {
    counter!("gate_rejections_total", "reason" => reason).increment(1);
}

pub fn record_login_attempt(gate: &str, accepted: bool) {
    let outcome = if accepted { "accepted" } else { "rejected" };
    counter!(
        "gate_login_attempts_total",
        "gate" => gate.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

/// Set the number of identifiers a limiter is tracking.
pub fn record_tracked_identifiers(limiter: &str, count: usize) {
    gauge!("gate_rate_limit_tracked", "limiter" => limiter.to_string()).set(count as f64);
}

pub fn record_upstream_error() {
    counter!("gate_upstream_errors_total").increment(1);
}
