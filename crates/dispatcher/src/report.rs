//! Final pool report

use contracts::{Endpoint, PoolMode};
use serde::Serialize;
use session::ConnectionMetricsSnapshot;

use crate::{PoolMetricsSnapshot, SkippedChannel};

/// How a shard ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "error", rename_all = "snake_case")]
pub enum ShardOutcome {
    /// Cancelled while healthy (or between retries)
    Stopped,
    /// Gave up; carries the final error
    Failed(String),
}

impl ShardOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Outcome of one shard across all its connection attempts
#[derive(Debug, Clone, Serialize)]
pub struct ShardReport {
    pub index: usize,
    pub endpoint: Endpoint,
    pub channels: usize,
    pub outcome: ShardOutcome,
    /// Connections that reached Active (one log file each)
    pub connections_opened: u32,
    /// Counters summed over every connection of the shard
    pub metrics: ConnectionMetricsSnapshot,
}

/// Aggregated result of a pool run
#[derive(Debug, Clone, Serialize)]
pub struct PoolReport {
    pub mode: PoolMode,
    pub shards: Vec<ShardReport>,
    pub skipped: Vec<SkippedChannel>,
    pub pool: PoolMetricsSnapshot,
}

impl PoolReport {
    pub fn failed_shards(&self) -> impl Iterator<Item = &ShardReport> {
        self.shards.iter().filter(|s| s.outcome.is_failed())
    }

    /// True when there was nothing to run or every shard failed
    pub fn all_failed(&self) -> bool {
        self.shards.iter().all(|s| s.outcome.is_failed())
    }

    pub fn connections_opened(&self) -> u32 {
        self.shards.iter().map(|s| s.connections_opened).sum()
    }

    /// Counters summed over all shards
    pub fn totals(&self) -> ConnectionMetricsSnapshot {
        let mut total = ConnectionMetricsSnapshot::default();
        for shard in &self.shards {
            total += shard.metrics;
        }
        total
    }
}
