//! Prometheus metrics exposition
//!
//! - `gateway_logins_total` (counter)
//! - `gateway_callbacks_total` (counter): label `outcome`
//! - `gateway_token_requests_total` (counter): labels `grant`, `outcome`
//! - `gateway_resource_requests_total` (counter): label `outcome`
//! - `gateway_provider_request_duration_seconds` (histogram): label `operation`

use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};

const PROVIDER_DURATION: &str = "gateway_provider_request_duration_seconds";

/// Buckets from 5ms up to the longest provider timeout we expect to configure.
const PROVIDER_DURATION_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
];

fn builder() -> Result<PrometheusBuilder, BuildError> {
    PrometheusBuilder::new().set_buckets_for_metric(
        Matcher::Full(PROVIDER_DURATION.to_string()),
        PROVIDER_DURATION_BUCKETS,
    )
}

/// Install the global Prometheus recorder and return a handle for `/metrics`.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    builder()?.install_recorder()
}

pub fn record_login() {
    metrics::counter!("gateway_logins_total").increment(1);
}

/// `outcome`: success, provider_error, state_mismatch, exchange_failed, ...
pub fn record_callback(outcome: &'static str) {
    metrics::counter!("gateway_callbacks_total", "outcome" => outcome).increment(1);
}

/// `grant`: authorization_code or refresh_token.
pub fn record_token_request(grant: &'static str, outcome: &'static str) {
    metrics::counter!("gateway_token_requests_total", "grant" => grant, "outcome" => outcome)
        .increment(1);
}

pub fn record_resource_request(outcome: &'static str) {
    metrics::counter!("gateway_resource_requests_total", "outcome" => outcome).increment(1);
}

/// `operation`: token_exchange, token_refresh, profile, playlists.
pub fn record_provider_duration(operation: &'static str, duration_secs: f64) {
    metrics::histogram!(PROVIDER_DURATION, "operation" => operation).record(duration_secs);
}
