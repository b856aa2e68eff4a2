//! Per-connection counters

use std::ops::AddAssign;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use recorder::ChunkStats;
use serde::Serialize;

/// Live counters for one connection, shared with its handle
#[derive(Debug, Default)]
pub struct ConnectionMetrics {
    lines_recorded: AtomicU64,
    bytes_recorded: AtomicU64,
    partial_writes: AtomicU64,
    joins_sent: AtomicU64,
    keepalives_sent: AtomicU64,
    join_queue_len: AtomicUsize,
}

impl ConnectionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account one recorded read
    pub fn record_chunk(&self, stats: ChunkStats) {
        self.lines_recorded.fetch_add(stats.lines, Ordering::Relaxed);
        self.bytes_recorded.fetch_add(stats.bytes, Ordering::Relaxed);
        if stats.partial_bytes > 0 {
            self.partial_writes.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn lines_recorded(&self) -> u64 {
        self.lines_recorded.load(Ordering::Relaxed)
    }

    pub fn bytes_recorded(&self) -> u64 {
        self.bytes_recorded.load(Ordering::Relaxed)
    }

    pub fn joins_sent(&self) -> u64 {
        self.joins_sent.load(Ordering::Relaxed)
    }

    pub fn inc_joins_sent(&self) {
        self.joins_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn keepalives_sent(&self) -> u64 {
        self.keepalives_sent.load(Ordering::Relaxed)
    }

    pub fn inc_keepalives_sent(&self) {
        self.keepalives_sent.fetch_add(1, Ordering::Relaxed);
    }

    /// Pending JOIN requests (approximate)
    pub fn join_queue_len(&self) -> usize {
        self.join_queue_len.load(Ordering::Relaxed)
    }

    pub fn set_join_queue_len(&self, len: usize) {
        self.join_queue_len.store(len, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ConnectionMetricsSnapshot {
        ConnectionMetricsSnapshot {
            lines_recorded: self.lines_recorded(),
            bytes_recorded: self.bytes_recorded(),
            partial_writes: self.partial_writes.load(Ordering::Relaxed),
            joins_sent: self.joins_sent(),
            keepalives_sent: self.keepalives_sent(),
        }
    }
}

/// Point-in-time copy of [`ConnectionMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConnectionMetricsSnapshot {
    pub lines_recorded: u64,
    pub bytes_recorded: u64,
    pub partial_writes: u64,
    pub joins_sent: u64,
    pub keepalives_sent: u64,
}

impl AddAssign for ConnectionMetricsSnapshot {
    fn add_assign(&mut self, other: Self) {
        self.lines_recorded += other.lines_recorded;
        self.bytes_recorded += other.bytes_recorded;
        self.partial_writes += other.partial_writes;
        self.joins_sent += other.joins_sent;
        self.keepalives_sent += other.keepalives_sent;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_chunk() {
        let metrics = ConnectionMetrics::new();
        metrics.record_chunk(ChunkStats {
            lines: 2,
            bytes: 30,
            partial_bytes: 4,
        });
        metrics.record_chunk(ChunkStats {
            lines: 1,
            bytes: 10,
            partial_bytes: 0,
        });

        let snap = metrics.snapshot();
        assert_eq!(snap.lines_recorded, 3);
        assert_eq!(snap.bytes_recorded, 40);
        assert_eq!(snap.partial_writes, 1);
    }

    #[test]
    fn test_snapshot_sum() {
        let mut total = ConnectionMetricsSnapshot::default();
        total += ConnectionMetricsSnapshot {
            joins_sent: 2,
            ..Default::default()
        };
        total += ConnectionMetricsSnapshot {
            joins_sent: 3,
            keepalives_sent: 1,
            ..Default::default()
        };
        assert_eq!(total.joins_sent, 5);
        assert_eq!(total.keepalives_sent, 1);
    }
}
