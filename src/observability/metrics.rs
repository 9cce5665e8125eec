//! Metrics collection and exposition.
//!
//! # Metrics
//! - `cortex_bootstrap_runs_total` (counter): completed runs by status
//! - `cortex_bootstrap_duration_seconds` (histogram): run wall time
//! - `cortex_bootstrap_phases_total` (counter): phase outcomes by phase, status
//! - `cortex_probe_duration_seconds` (histogram): probe latency by dependency
//! - `cortex_probe_up` (gauge): 1=last probe ok, 0=failed
//! - `cortex_circuit_state` (gauge): 0=closed, 1=half-open, 2=open

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::resilience::CircuitState;

/// Install the Prometheus recorder with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_bootstrap(status: &'static str, elapsed: Duration) {
    metrics::counter!("cortex_bootstrap_runs_total", "status" => status).increment(1);
    metrics::histogram!("cortex_bootstrap_duration_seconds").record(elapsed.as_secs_f64());
}

pub fn record_phase(phase: &str, status: &'static str) {
    metrics::counter!(
        "cortex_bootstrap_phases_total",
        "phase" => phase.to_string(),
        "status" => status
    )
    .increment(1);
}

pub fn record_probe(dependency: &'static str, ok: bool, elapsed: Duration) {
    metrics::histogram!("cortex_probe_duration_seconds", "dependency" => dependency)
        .record(elapsed.as_secs_f64());
    metrics::gauge!("cortex_probe_up", "dependency" => dependency).set(if ok { 1.0 } else { 0.0 });
}

pub fn record_circuit_state(breaker: &str, state: CircuitState) {
    let value = match state {
        CircuitState::Closed => 0.0,
        CircuitState::HalfOpen => 1.0,
        CircuitState::Open => 2.0,
    };
    metrics::gauge!("cortex_circuit_state", "breaker" => breaker.to_string()).set(value);
}
