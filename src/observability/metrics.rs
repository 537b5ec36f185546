//! Metrics collection and exposition.
//!
//! # Metrics
//! - `hyperatomic_connections_total` (counter): accepted connections
//! - `hyperatomic_active_connections` (gauge): live connection handlers
//! - `hyperatomic_messages_total` (counter): lines received and acknowledged
//! - `hyperatomic_connection_errors_total` (counter): accept/read/write errors by stage
//! - `hyperatomic_handler_panics_total` (counter): handler tasks that panicked
//! - `hyperatomic_log_records_dropped_total` (counter): records lost to a full queue
//! - `hyperatomic_log_write_errors_total` (counter): failed sink writes/flushes
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade and costs nothing until a
//!   recorder is installed
//! - The Prometheus endpoint is opt-in (`[hyperatomic.metrics] enabled`)

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and serve it on `addr`.
///
/// Must be called within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_connection_opened() {
    metrics::counter!("hyperatomic_connections_total").increment(1);
    metrics::gauge!("hyperatomic_active_connections").increment(1.0);
}

pub fn record_connection_closed() {
    metrics::gauge!("hyperatomic_active_connections").decrement(1.0);
}

pub fn record_message() {
    metrics::counter!("hyperatomic_messages_total").increment(1);
}

/// `stage` is one of `accept`, `read`, `write`.
pub fn record_connection_error(stage: &'static str) {
    metrics::counter!("hyperatomic_connection_errors_total", "stage" => stage).increment(1);
}

pub fn record_handler_panic() {
    metrics::counter!("hyperatomic_handler_panics_total").increment(1);
}

pub fn record_log_dropped() {
    metrics::counter!("hyperatomic_log_records_dropped_total").increment(1);
}

pub fn record_log_write_error() {
    metrics::counter!("hyperatomic_log_write_errors_total").increment(1);
}
