//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by method, status, cache result
//! - `proxy_request_duration_seconds` (histogram): latency distribution
//! - `proxy_cache_lookups_total` (counter): lookups by tier and result
//! - `proxy_cache_entries` (gauge): entries held by the local tier
//! - `proxy_remote_errors_total` (counter): failed remote tier operations
//! - `proxy_origin_errors_total` (counter): failed origin round trips

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its HTTP scrape endpoint.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, cache: &'static str, start: Instant) {
    let method = method.to_string();
    let status = status.to_string();
    counter!(
        "proxy_requests_total",
        "method" => method.clone(),
        "status" => status.clone(),
        "cache" => cache
    )
    .increment(1);
    histogram!(
        "proxy_request_duration_seconds",
        "method" => method,
        "status" => status,
        "cache" => cache
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_cache_lookup(tier: &'static str, hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    counter!("proxy_cache_lookups_total", "tier" => tier, "result" => result).increment(1);
}

pub fn record_cache_size(entries: usize) {
    gauge!("proxy_cache_entries").set(entries as f64);
}

pub fn record_remote_error(op: &'static str) {
    counter!("proxy_remote_errors_total", "op" => op).increment(1);
}

pub fn record_origin_error() {
    counter!("proxy_origin_errors_total").increment(1);
}
