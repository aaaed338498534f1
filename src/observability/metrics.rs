//! Metrics collection and exposition.
//!
//! # Metrics
//! - `dynconf_rounds_total` (counter): reconfiguration rounds by outcome
//!   (`committed`, `noop`, `aborted`)
//! - `dynconf_rejected_keys_total` (counter): sanitizer rejections by reason
//! - `dynconf_effective_generation` (gauge): generation of the effective
//!   configuration currently in force

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::errors::RejectionReason;

/// Install the Prometheus recorder and exposition endpoint.
///
/// Must run inside a tokio runtime; failure is logged, not fatal.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint started"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Count a finished reconfiguration round.
pub fn record_round(outcome: &'static str) {
    metrics::counter!("dynconf_rounds_total", "outcome" => outcome).increment(1);
}

/// Count a key dropped or refused by the sanitizer.
pub fn record_rejected_key(reason: RejectionReason) {
    metrics::counter!("dynconf_rejected_keys_total", "reason" => reason.as_str()).increment(1);
}

/// Publish the generation of the newly committed effective configuration.
pub fn record_generation(generation: u64) {
    metrics::gauge!("dynconf_effective_generation").set(generation as f64);
}
