//! Metrics collection and exposition.
//!
//! # Metrics
//! - `appconfig_refresh_total` (counter): snapshot refreshes by outcome
//! - `appconfig_reconnects_total` (counter): live channel reconnect attempts
//! - `appconfig_change_signals_total` (counter): change signals received
//! - `appconfig_snapshot_features` / `appconfig_snapshot_properties` (gauge)
//! - `appconfig_channel_connected` (gauge): 1=connected, 0=disconnected
//!
//! Recording is a no-op until a recorder is installed.

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Installs the Prometheus exporter on the given address.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_refresh(outcome: &'static str) {
    ::metrics::counter!("appconfig_refresh_total", "outcome" => outcome).increment(1);
}

pub fn record_reconnect() {
    ::metrics::counter!("appconfig_reconnects_total").increment(1);
}

pub fn record_change_signal() {
    ::metrics::counter!("appconfig_change_signals_total").increment(1);
}

pub fn record_snapshot_size(features: usize, properties: usize) {
    ::metrics::gauge!("appconfig_snapshot_features").set(features as f64);
    ::metrics::gauge!("appconfig_snapshot_properties").set(properties as f64);
}

pub fn record_channel_connected(connected: bool) {
    ::metrics::gauge!("appconfig_channel_connected").set(if connected { 1.0 } else { 0.0 });
}
