//! Prometheus metrics for the VWAVE client.
//!
//! Covers:
//! - RPC errors and fallback provider usage
//! - Polling latency and failures per data source
//! - Transaction submission outcomes
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. If registration fails,
//! it indicates a fatal configuration error (e.g., duplicate metric names)
//! that should cause an immediate crash at startup rather than silent failure.
//! These panics only occur during static initialization, never at runtime.

use crate::error::{TelemetryError, TelemetryResult};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, register_int_gauge, register_int_gauge_vec, CounterVec,
    Encoder, HistogramVec, IntGauge, IntGaugeVec, TextEncoder,
};

/// Calls answered by the fallback provider.
/// Labels: method
pub static RPC_FALLBACK_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "vwave_rpc_fallback_total",
        "Total RPC calls retried on the fallback provider",
        &["method"]
    )
    .unwrap()
});

/// Failed RPC calls.
/// Labels: method, provider (primary/fallback)
pub static RPC_ERRORS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "vwave_rpc_errors_total",
        "Total failed RPC calls",
        &["method", "provider"]
    )
    .unwrap()
});

/// Duration of one polling round per data source.
pub static POLL_DURATION_MS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "vwave_poll_duration_ms",
        "Polling round duration in milliseconds",
        &["source"],
        vec![5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2000.0, 5000.0]
    )
    .unwrap()
});

/// Polling rounds that produced no data.
pub static POLL_FAILURES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "vwave_poll_failures_total",
        "Total polling rounds that failed",
        &["source"]
    )
    .unwrap()
});

/// Tokens currently held in the info-token store.
pub static INFO_TOKENS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("vwave_info_tokens", "Tokens in the latest info-token snapshot").unwrap()
});

/// Transactions handed to the wallet endpoint.
/// Labels: action
pub static TX_SUBMITTED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "vwave_tx_submitted_total",
        "Total transactions submitted",
        &["action"]
    )
    .unwrap()
});

/// Rejected or failed submissions.
/// Labels: action, reason (not_enough_funds/user_denied/slippage/other/in_flight)
pub static TX_FAILED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "vwave_tx_failed_total",
        "Total transaction submissions that failed",
        &["action", "reason"]
    )
    .unwrap()
});

/// Submissions currently awaiting a wallet response, per action.
pub static TX_IN_FLIGHT: Lazy<IntGaugeVec> = Lazy::new(|| {
    register_int_gauge_vec!(
        "vwave_tx_in_flight",
        "Transactions awaiting a wallet response",
        &["action"]
    )
    .unwrap()
});

/// Metrics helper for recording observations.
pub struct Metrics;

impl Metrics {
    /// Record a call answered by the fallback provider.
    pub fn rpc_fallback(method: &str) {
        RPC_FALLBACK_TOTAL.with_label_values(&[method]).inc();
    }

    /// Record a failed RPC call.
    pub fn rpc_error(method: &str, provider: &str) {
        RPC_ERRORS_TOTAL.with_label_values(&[method, provider]).inc();
    }

    /// Record how long a polling round took.
    pub fn poll_duration(source: &str, duration_ms: f64) {
        POLL_DURATION_MS
            .with_label_values(&[source])
            .observe(duration_ms);
    }

    pub fn poll_failed(source: &str) {
        POLL_FAILURES_TOTAL.with_label_values(&[source]).inc();
    }

    pub fn info_tokens(count: usize) {
        INFO_TOKENS.set(i64::try_from(count).unwrap_or(i64::MAX));
    }

    /// Record a transaction handed to the wallet.
    pub fn tx_submitted(action: &str) {
        TX_SUBMITTED_TOTAL.with_label_values(&[action]).inc();
    }

    /// Record a failed submission.
    pub fn tx_failed(action: &str, reason: &str) {
        TX_FAILED_TOTAL.with_label_values(&[action, reason]).inc();
    }

    pub fn tx_in_flight_inc(action: &str) {
        TX_IN_FLIGHT.with_label_values(&[action]).inc();
    }

    pub fn tx_in_flight_dec(action: &str) {
        TX_IN_FLIGHT.with_label_values(&[action]).dec();
    }

    /// Render every registered metric in the Prometheus text format.
    pub fn render() -> TelemetryResult<String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&prometheus::gather(), &mut buffer)
            .map_err(|e| TelemetryError::Metrics(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::Metrics(e.to_string()))
    }
}
