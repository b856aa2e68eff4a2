//! `run` command implementation.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use dispatcher::{Dispatcher, DispatcherConfig};
use recorder::{BinaryLogConfig, BinaryLogFactory, SystemClock};
use resolver::HttpResolver;
use session::{Connector, SessionSettings, TcpDialer};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::blueprint::load_blueprint;
use crate::cli::RunArgs;
use crate::error::CliError;
use crate::summary::print_report;

/// Execute the `run` command
pub async fn run_recorder(args: &RunArgs) -> Result<()> {
    let mut blueprint = load_blueprint(&args.pool)?;
    if let Some(ref dir) = args.output_dir {
        info!(dir = %dir.display(), "Overriding output directory from CLI");
        blueprint.output.directory = dir.clone();
    }

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)
            .context("Failed to start metrics exporter")?;
    }

    let clock = Arc::new(SystemClock::new());
    let sinks = BinaryLogFactory::new(BinaryLogConfig::from(&blueprint.output), clock.clone());
    let resolver = HttpResolver::new(blueprint.server.resolver_url.clone())
        .context("Failed to build discovery client")?;
    let connector = Connector::new(
        Arc::new(TcpDialer),
        Arc::new(sinks),
        clock,
        SessionSettings::from(&blueprint),
    );
    let dispatcher = Dispatcher::new(
        connector,
        Arc::new(resolver),
        DispatcherConfig::from(&blueprint),
    );

    let plan = dispatcher.plan(&blueprint.channels).await;
    if plan.is_empty() {
        return Err(CliError::NoChannels {
            skipped: plan.skipped.len(),
        }
        .into());
    }

    let cancel = CancellationToken::new();
    let started = Instant::now();
    let pool = dispatcher.start(plan, cancel.clone());
    let shards = pool.shard_count();

    info!(
        shards,
        output = %blueprint.output.directory.display(),
        "Recording started"
    );

    let deadline = async {
        match args.timeout {
            0 => std::future::pending::<()>().await,
            secs => tokio::time::sleep(Duration::from_secs(secs)).await,
        }
    };

    let wait = pool.wait();
    tokio::pin!(wait);

    let report = tokio::select! {
        report = &mut wait => report,
        _ = shutdown_signal() => {
            warn!("Received shutdown signal, stopping recorder...");
            cancel.cancel();
            wait.await
        }
        _ = deadline => {
            info!(timeout_secs = args.timeout, "Timeout reached, stopping recorder...");
            cancel.cancel();
            wait.await
        }
    };

    print_report(&report, started.elapsed());

    if report.all_failed() {
        return Err(CliError::AllShardsFailed { shards }.into());
    }

    info!("Chat recorder finished");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM. A handler that cannot be installed is
/// logged and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
