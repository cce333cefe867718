//! Metrics collection and exposition.
//!
//! # Metrics
//! - `wallet_unlock_attempts_total` (counter): unlock attempts by outcome
//! - `wallet_transactions_submitted_total` (counter): broadcast transfers
//! - `wallet_transaction_status_total` (counter): terminal transitions by status
//! - `wallet_pending_transactions` (gauge): pending records seen by the last tick
//! - `wallet_rpc_healthy` (gauge): 1=reachable, 0=unreachable

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Install the Prometheus exporter listening on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// `outcome` is one of `success`, `failure`, `throttled`.
pub fn record_unlock_attempt(outcome: &'static str) {
    counter!("wallet_unlock_attempts_total", "outcome" => outcome).increment(1);
}

pub fn record_transaction_submitted() {
    counter!("wallet_transactions_submitted_total").increment(1);
}

pub fn record_transaction_status(status: &'static str) {
    counter!("wallet_transaction_status_total", "status" => status).increment(1);
}

pub fn record_pending_transactions(count: usize) {
    gauge!("wallet_pending_transactions").set(count as f64);
}

pub fn record_rpc_health(healthy: bool) {
    gauge!("wallet_rpc_healthy").set(if healthy { 1.0 } else { 0.0 });
}
