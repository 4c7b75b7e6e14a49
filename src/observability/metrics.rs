//! Metrics collection and exposition.
//!
//! # Metrics
//! - `filter_requests_total` (counter): requests by outcome
//! - `filter_forward_duration_seconds` (histogram): outbound latency
//! - `filter_forward_failures_total` (counter): failed forwards
//! - `filter_ledger_keys` (gauge): keys held by the delay ledger
//!
//! Recording is a no-op until a recorder is installed.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Count a handled request by outcome label.
pub fn record_request(outcome: &'static str) {
    counter!("filter_requests_total", "outcome" => outcome).increment(1);
}

/// Record one outbound forward.
pub fn record_forward(success: bool, start: Instant) {
    histogram!("filter_forward_duration_seconds").record(start.elapsed().as_secs_f64());
    if !success {
        counter!("filter_forward_failures_total").increment(1);
    }
}

/// Track the ledger size.
pub fn record_ledger_keys(count: usize) {
    gauge!("filter_ledger_keys").set(count as f64);
}
