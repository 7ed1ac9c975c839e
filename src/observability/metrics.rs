//! Metrics collection and exposition.
//!
//! # Metrics
//! - `replay_requests_total` (counter): requests by outcome
//! - `replay_relay_duration_seconds` (histogram): relay latency by target
//! - `replay_cache_lookups_total` (counter): hit / miss / bypass
//! - `replay_cache_mutations_total` (counter): store / invalidate
//! - `replay_cache_entries` (gauge): stored entries, expired ones included
//!
//! Updates are no-ops until [`init_metrics`] installs the Prometheus recorder.

use std::net::SocketAddr;
use std::time::Instant;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record how a request left the replay pipeline.
pub fn record_request(method: &str, outcome: &'static str, status: u16) {
    counter!(
        "replay_requests_total",
        "method" => method.to_string(),
        "outcome" => outcome,
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record the latency of one relay to a backend or the authority.
pub fn record_relay(target: &str, status: u16, start: Instant) {
    histogram!(
        "replay_relay_duration_seconds",
        "target" => target.to_string(),
        "status" => status.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_cache_lookup(result: &'static str) {
    counter!("replay_cache_lookups_total", "result" => result).increment(1);
}

pub fn record_cache_mutation(action: &'static str) {
    counter!("replay_cache_mutations_total", "action" => action).increment(1);
}

pub fn record_cache_size(size: usize) {
    gauge!("replay_cache_entries").set(size as f64);
}
