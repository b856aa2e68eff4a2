//! Dispatcher - plans the pool and runs one supervisor per shard

use std::sync::Arc;

use contracts::{
    normalize_channels, ChannelResolver, Endpoint, PoolMode, RecordSinkFactory, RecorderBlueprint,
};
use session::{Connector, Dialer};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::supervisor::supervise;
use crate::{
    PoolMetrics, PoolMetricsSnapshot, PoolPlan, PoolReport, ReconnectPolicy, ShardOutcome,
    ShardReport, SkippedChannel,
};

/// Dispatcher configuration
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub mode: PoolMode,
    /// Fixed endpoint for sharded mode
    pub endpoint: Endpoint,
    pub shard_size: usize,
    pub reconnect: ReconnectPolicy,
}

impl From<&RecorderBlueprint> for DispatcherConfig {
    fn from(blueprint: &RecorderBlueprint) -> Self {
        Self {
            mode: blueprint.server.mode,
            endpoint: blueprint.server.endpoint.clone(),
            shard_size: blueprint.server.shard_size,
            reconnect: ReconnectPolicy::from(&blueprint.reconnect),
        }
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self::from(&RecorderBlueprint::default())
    }
}

/// Plans channel assignment and starts the pool
pub struct Dispatcher<D, F, R> {
    connector: Connector<D, F>,
    resolver: Arc<R>,
    config: DispatcherConfig,
}

impl<D, F, R> Dispatcher<D, F, R>
where
    D: Dialer + 'static,
    F: RecordSinkFactory + 'static,
    R: ChannelResolver + 'static,
{
    pub fn new(connector: Connector<D, F>, resolver: Arc<R>, config: DispatcherConfig) -> Self {
        Self {
            connector,
            resolver,
            config,
        }
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Normalize raw channel names and assign them to shards.
    ///
    /// Blank inputs are dropped silently; duplicates are dropped with a
    /// warning. Direct mode resolves every channel first.
    #[instrument(name = "dispatcher_plan", skip_all, fields(mode = %self.config.mode))]
    pub async fn plan<I, S>(&self, raw: I) -> PoolPlan
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let (channels, duplicates) = normalize_channels(raw);
        for duplicate in &duplicates {
            warn!(channel = %duplicate, "Duplicate channel ignored");
        }

        let mut plan = match self.config.mode {
            PoolMode::Sharded => {
                PoolPlan::sharded(channels, &self.config.endpoint, self.config.shard_size)
            }
            PoolMode::Direct => PoolPlan::direct(channels, Arc::clone(&self.resolver)).await,
        };
        plan.duplicates = duplicates;

        info!(
            shards = plan.shards.len(),
            channels = plan.channel_count(),
            skipped = plan.skipped.len(),
            "Pool planned"
        );
        plan
    }

    /// Start one supervisor per shard. Cancelling `cancel` (or calling
    /// [`Pool::shutdown`]) stops every shard.
    #[instrument(name = "dispatcher_start", skip_all, fields(shards = plan.shards.len()))]
    pub fn start(&self, plan: PoolPlan, cancel: CancellationToken) -> Pool {
        let cancel = cancel.child_token();
        let metrics = Arc::new(PoolMetrics::new());

        let shards = plan
            .shards
            .into_iter()
            .map(|shard| {
                let header = ShardHeader {
                    index: shard.index,
                    endpoint: shard.endpoint.clone(),
                    channels: shard.channels.len(),
                };
                let task = tokio::spawn(supervise(
                    self.connector.clone(),
                    shard,
                    self.config.reconnect,
                    Arc::clone(&metrics),
                    cancel.child_token(),
                ));
                (header, task)
            })
            .collect();

        Pool {
            mode: plan.mode,
            shards,
            skipped: plan.skipped,
            cancel,
            metrics,
        }
    }

    /// Plan and start in one step
    pub async fn run<I, S>(&self, raw: I, cancel: CancellationToken) -> Pool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let plan = self.plan(raw).await;
        self.start(plan, cancel)
    }
}

struct ShardHeader {
    index: usize,
    endpoint: Endpoint,
    channels: usize,
}

/// Running pool of shard supervisors
pub struct Pool {
    mode: PoolMode,
    shards: Vec<(ShardHeader, JoinHandle<ShardReport>)>,
    skipped: Vec<SkippedChannel>,
    cancel: CancellationToken,
    metrics: Arc<PoolMetrics>,
}

impl Pool {
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    pub fn metrics(&self) -> PoolMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Token that stops the whole pool
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stop every shard gracefully
    pub fn shutdown(&self) {
        info!("Pool shutdown requested");
        self.cancel.cancel();
    }

    /// Wait until every shard has stopped or failed
    #[instrument(name = "pool_wait", skip(self), fields(shards = self.shards.len()))]
    pub async fn wait(self) -> PoolReport {
        let mut reports = Vec::with_capacity(self.shards.len());

        for (header, task) in self.shards {
            let report = match task.await {
                Ok(report) => report,
                Err(e) => {
                    error!(shard = header.index, error = %e, "Supervisor task panicked");
                    ShardReport {
                        index: header.index,
                        endpoint: header.endpoint,
                        channels: header.channels,
                        outcome: ShardOutcome::Failed(format!("supervisor panicked: {e}")),
                        connections_opened: 0,
                        metrics: Default::default(),
                    }
                }
            };
            reports.push(report);
        }

        let report = PoolReport {
            mode: self.mode,
            shards: reports,
            skipped: self.skipped,
            pool: self.metrics.snapshot(),
        };
        info!(
            shards = report.shards.len(),
            failed = report.failed_shards().count(),
            connections = report.connections_opened(),
            "Pool finished"
        );
        report
    }
}
