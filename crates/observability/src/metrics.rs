//! Recorder metrics
//!
//! Thin helpers over the `metrics` facade. They are no-ops until a
//! recorder (e.g. the Prometheus exporter) is installed.

use metrics::{counter, gauge};

/// Terminated lines written to a connection's log
pub fn record_lines_recorded(connection: &str, lines: u64, bytes: u64) {
    counter!(
        "chat_recorder_lines_total",
        "connection" => connection.to_string()
    )
    .increment(lines);
    counter!(
        "chat_recorder_bytes_total",
        "connection" => connection.to_string()
    )
    .increment(bytes);
}

/// Unterminated tail written ahead of its terminator
pub fn record_partial_write(connection: &str, bytes: u64) {
    counter!(
        "chat_recorder_partial_writes_total",
        "connection" => connection.to_string()
    )
    .increment(1);
    counter!(
        "chat_recorder_partial_bytes_total",
        "connection" => connection.to_string()
    )
    .increment(bytes);
}

pub fn record_join_sent(connection: &str) {
    counter!(
        "chat_recorder_joins_total",
        "connection" => connection.to_string()
    )
    .increment(1);
}

pub fn record_keepalive_sent(connection: &str) {
    counter!(
        "chat_recorder_keepalives_total",
        "connection" => connection.to_string()
    )
    .increment(1);
}

/// Pending JOIN requests for a connection
pub fn record_join_queue_depth(connection: &str, depth: usize) {
    gauge!(
        "chat_recorder_join_queue_depth",
        "connection" => connection.to_string()
    )
    .set(depth as f64);
}

pub fn record_connection_opened(endpoint: &str) {
    counter!(
        "chat_recorder_connections_opened_total",
        "endpoint" => endpoint.to_string()
    )
    .increment(1);
    gauge!("chat_recorder_connections_active").increment(1.0);
}

/// Connection left the Active state; `reason` is "stopped" or an error kind
pub fn record_connection_closed(reason: &str) {
    counter!(
        "chat_recorder_connections_closed_total",
        "reason" => reason.to_string()
    )
    .increment(1);
    gauge!("chat_recorder_connections_active").decrement(1.0);
}

pub fn record_connect_failure(endpoint: &str) {
    counter!(
        "chat_recorder_connect_failures_total",
        "endpoint" => endpoint.to_string()
    )
    .increment(1);
}

pub fn record_reconnect(shard: usize) {
    counter!(
        "chat_recorder_reconnects_total",
        "shard" => shard.to_string()
    )
    .increment(1);
}

/// Channel dropped before assignment (resolver failure, no endpoint)
pub fn record_channel_skipped(reason: &str) {
    counter!(
        "chat_recorder_channels_skipped_total",
        "reason" => reason.to_string()
    )
    .increment(1);
}
