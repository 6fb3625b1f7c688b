//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_requests_total` (counter): requests by method, status, kind
//! - `relay_request_duration_seconds` (histogram): latency by kind
//! - `relay_upstream_failures_total` (counter): failed fetches by policy
//! - `relay_cache_hits_total` (counter): failures answered from the cache
//! - `relay_cache_entries` (gauge): current cache size
//!
//! `kind` is `media`, `passthrough`, `cache` or `rejected`.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    let builder = PrometheusBuilder::new().with_http_listener(addr);
    match builder.install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, kind: &'static str, start: Instant) {
    counter!(
        "relay_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "kind" => kind
    )
    .increment(1);
    histogram!("relay_request_duration_seconds", "kind" => kind)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_upstream_failure(policy: &'static str) {
    counter!("relay_upstream_failures_total", "policy" => policy).increment(1);
}

pub fn record_cache_hit() {
    counter!("relay_cache_hits_total").increment(1);
}

pub fn record_cache_size(entries: usize) {
    gauge!("relay_cache_entries").set(entries as f64);
}
