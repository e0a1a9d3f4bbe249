//! Prometheus metrics for the relay
//!
//! The relay has no inbound network surface, so metrics are exported by
//! writing the text exposition format to a file picked up by node-exporter's
//! textfile collector.

use lazy_static::lazy_static;
use prometheus::{
    register_counter, register_counter_vec, register_gauge, register_histogram, Counter,
    CounterVec, Encoder, Gauge, Histogram, TextEncoder,
};
use std::path::Path;

lazy_static! {
    /// Counter: processed cases by outcome
    pub static ref CASES: CounterVec = register_counter_vec!(
        "casebridge_cases_total",
        "Cases processed by outcome",
        &["outcome"]
    )
    .expect("Failed to create cases metric");

    /// Counter: API errors by remote system and kind
    pub static ref API_ERRORS: CounterVec = register_counter_vec!(
        "casebridge_api_errors_total",
        "Total API errors by system and kind",
        &["system", "kind"]
    )
    .expect("Failed to create api_errors metric");

    /// Counter: completed poll cycles
    pub static ref CYCLES: Counter = register_counter!(
        "casebridge_cycles_total",
        "Completed poll cycles"
    )
    .expect("Failed to create cycles metric");

    /// Histogram: poll cycle duration (seconds)
    pub static ref CYCLE_DURATION: Histogram = register_histogram!(
        "casebridge_cycle_duration_seconds",
        "Duration of poll cycles",
        vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 300.0]
    )
    .expect("Failed to create cycle_duration metric");

    /// Gauge: completion time of the last cycle (unix seconds)
    pub static ref LAST_CYCLE: Gauge = register_gauge!(
        "casebridge_last_cycle_timestamp_seconds",
        "Unix time the last poll cycle finished"
    )
    .expect("Failed to create last_cycle metric");

    /// Gauge: relay health status (1 = healthy, 0 = unhealthy)
    pub static ref HEALTH_STATUS: Gauge = register_gauge!(
        "casebridge_health_status",
        "Relay health status (1 = healthy, 0 = unhealthy)"
    )
    .expect("Failed to create health_status metric");
}

/// Count one processed case
pub fn record_case(outcome: &str) {
    CASES.with_label_values(&[outcome]).inc();
}

/// Increment API error counter
pub fn record_api_error(system: &str, kind: &str) {
    API_ERRORS.with_label_values(&[system, kind]).inc();
}

/// Record a finished cycle
pub fn record_cycle(duration_secs: f64, finished_at_unix: i64) {
    CYCLES.inc();
    CYCLE_DURATION.observe(duration_secs);
    LAST_CYCLE.set(finished_at_unix as f64);
}

/// Set health status
pub fn set_health_status(healthy: bool) {
    HEALTH_STATUS.set(if healthy { 1.0 } else { 0.0 });
}

/// Encode all metrics as Prometheus text format
pub fn encode_metrics() -> crate::Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| crate::RelayError::Other(format!("Failed to encode metrics: {}", e)))?;
    String::from_utf8(buffer)
        .map_err(|e| crate::RelayError::Other(format!("Metrics are not UTF-8: {}", e)))
}

/// Write metrics to `path`, replacing it atomically
pub fn write_textfile(path: &Path) -> crate::Result<()> {
    let output = encode_metrics()?;
    let tmp = path.with_extension("prom.tmp");
    std::fs::write(&tmp, output)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
