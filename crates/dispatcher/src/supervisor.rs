//! Per-shard supervisor: connect, join, wait, reconnect with backoff

use std::sync::Arc;
use std::time::Duration;

use contracts::RecordSinkFactory;
use session::{ConnectionMetricsSnapshot, Connector, Dialer, SessionError};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::{
    DispatcherError, PoolMetrics, ReconnectPolicy, ShardOutcome, ShardPlan, ShardReport,
};

/// How one connection attempt ended
enum Attempt {
    Stopped,
    Failed {
        error: SessionError,
        /// Time spent Active; `None` if the connection never got there
        uptime: Option<Duration>,
    },
}

#[instrument(
    name = "shard_supervisor",
    skip_all,
    fields(shard = shard.index, endpoint = %shard.endpoint)
)]
pub(crate) async fn supervise<D, F>(
    connector: Connector<D, F>,
    shard: ShardPlan,
    policy: ReconnectPolicy,
    metrics: Arc<PoolMetrics>,
    cancel: CancellationToken,
) -> ShardReport
where
    D: Dialer + 'static,
    F: RecordSinkFactory + 'static,
{
    let mut report = ShardReport {
        index: shard.index,
        endpoint: shard.endpoint.clone(),
        channels: shard.channels.len(),
        outcome: ShardOutcome::Stopped,
        connections_opened: 0,
        metrics: ConnectionMetricsSnapshot::default(),
    };
    let mut failures: u32 = 0;

    loop {
        let attempt = run_connection(&connector, &shard, &metrics, &cancel, &mut report).await;

        let (error, uptime) = match attempt {
            Attempt::Stopped => break,
            Attempt::Failed { error, uptime } => (error, uptime),
        };

        // Only a connection that held up for a while clears the streak;
        // one that drops right after login still counts against the shard
        if uptime.is_some_and(|uptime| policy.is_stable(uptime)) {
            failures = 0;
        }
        failures += 1;

        if failures >= policy.max_attempts {
            let error = DispatcherError::Exhausted {
                shard: shard.index,
                attempts: failures,
                last: error,
            };
            error!(shard = shard.index, error = %error, "Shard failed");
            metrics.inc_failed_shards();
            report.outcome = ShardOutcome::Failed(error.to_string());
            break;
        }

        let delay = policy.backoff.next(failures - 1);
        warn!(
            shard = shard.index,
            attempt = failures,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "Reconnecting"
        );
        metrics.inc_reconnects();
        observability::record_reconnect(shard.index);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }

    debug!(shard = shard.index, outcome = ?report.outcome, "Supervisor stopped");
    report
}

async fn run_connection<D, F>(
    connector: &Connector<D, F>,
    shard: &ShardPlan,
    metrics: &PoolMetrics,
    cancel: &CancellationToken,
    report: &mut ShardReport,
) -> Attempt
where
    D: Dialer + 'static,
    F: RecordSinkFactory + 'static,
{
    let handle = match connector
        .connect(shard.connection_id(), shard.endpoint.clone(), cancel.clone())
        .await
    {
        Ok(handle) => handle,
        Err(SessionError::Cancelled) => return Attempt::Stopped,
        Err(error) => {
            return Attempt::Failed {
                error,
                uptime: None,
            }
        }
    };

    let opened = Instant::now();
    report.connections_opened += 1;
    metrics.connection_opened();

    let enqueue = async {
        for channel in &shard.channels {
            handle.join(channel.clone()).await?;
        }
        Ok::<(), SessionError>(())
    };
    tokio::select! {
        queued = enqueue => match queued {
            Ok(()) => info!(
                shard = shard.index,
                channels = shard.channels.len(),
                "Channels queued"
            ),
            Err(e) => debug!(shard = shard.index, error = %e, "Connection ended while queueing"),
        },
        _ = handle.finished() => {}
    }

    let counters = Arc::clone(handle.metrics());
    let outcome = handle.wait().await;
    report.metrics += counters.snapshot();
    metrics.connection_closed();

    match outcome {
        Ok(_) | Err(SessionError::Cancelled) => Attempt::Stopped,
        Err(error) => Attempt::Failed {
            error,
            uptime: Some(opened.elapsed()),
        },
    }
}
