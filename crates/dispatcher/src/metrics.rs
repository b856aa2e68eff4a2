//! Pool-wide counters

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use serde::Serialize;

/// Live counters across all shards
#[derive(Debug, Default)]
pub struct PoolMetrics {
    /// Shards whose connection is currently up
    active_connections: AtomicUsize,
    connections_opened: AtomicU64,
    reconnects: AtomicU64,
    failed_shards: AtomicUsize,
}

impl PoolMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_connections(&self) -> usize {
        self.active_connections.load(Ordering::Relaxed)
    }

    pub fn connection_opened(&self) {
        self.connections_opened.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn connections_opened(&self) -> u64 {
        self.connections_opened.load(Ordering::Relaxed)
    }

    pub fn inc_reconnects(&self) {
        self.reconnects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn reconnects(&self) -> u64 {
        self.reconnects.load(Ordering::Relaxed)
    }

    pub fn inc_failed_shards(&self) {
        self.failed_shards.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failed_shards(&self) -> usize {
        self.failed_shards.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> PoolMetricsSnapshot {
        PoolMetricsSnapshot {
            active_connections: self.active_connections(),
            connections_opened: self.connections_opened(),
            reconnects: self.reconnects(),
            failed_shards: self.failed_shards(),
        }
    }
}

/// Snapshot of pool metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PoolMetricsSnapshot {
    pub active_connections: usize,
    pub connections_opened: u64,
    pub reconnects: u64,
    pub failed_shards: usize,
}
