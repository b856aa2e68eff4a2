//! # Dispatcher
//!
//! Connection pool for many channels.
//!
//! Responsibilities:
//! - Plan which channels share which connection (direct / sharded)
//! - Supervise one connection per shard, reconnecting with backoff
//! - Keep shard failures isolated and report every outcome

pub mod backoff;
pub mod error;
pub mod metrics;
pub mod plan;
pub mod pool;
pub mod report;
mod supervisor;

pub use backoff::{BackoffPolicy, ReconnectPolicy};
pub use error::DispatcherError;
pub use metrics::{PoolMetrics, PoolMetricsSnapshot};
pub use plan::{PoolPlan, ShardPlan, SkippedChannel};
pub use pool::{Dispatcher, DispatcherConfig, Pool};
pub use report::{PoolReport, ShardOutcome, ShardReport};
