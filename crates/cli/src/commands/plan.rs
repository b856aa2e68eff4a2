//! `plan` command implementation.

use std::sync::Arc;

use anyhow::{Context, Result};
use contracts::{normalize_channels, ChannelName, PoolMode, RecorderBlueprint};
use dispatcher::PoolPlan;
use resolver::HttpResolver;
use serde::Serialize;
use tracing::{info, warn};

use crate::blueprint::load_blueprint;
use crate::cli::PlanArgs;

/// Direct-mode plan shown without querying discovery
#[derive(Serialize)]
struct UnresolvedPlan {
    mode: PoolMode,
    resolved: bool,
    channels: Vec<ChannelName>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    duplicates: Vec<ChannelName>,
}

/// Execute the `plan` command
pub async fn run_plan(args: &PlanArgs) -> Result<()> {
    let blueprint = load_blueprint(&args.pool)?;
    let (channels, duplicates) = normalize_channels(&blueprint.channels);
    for duplicate in &duplicates {
        warn!(channel = %duplicate, "Duplicate channel ignored");
    }

    if blueprint.server.mode == PoolMode::Direct && !args.resolve {
        let unresolved = UnresolvedPlan {
            mode: PoolMode::Direct,
            resolved: false,
            channels,
            duplicates,
        };
        if args.json {
            println!("{}", serde_json::to_string_pretty(&unresolved)?);
        } else {
            print_unresolved(&unresolved);
        }
        return Ok(());
    }

    let mut plan = build_plan(&blueprint, channels).await?;
    plan.duplicates = duplicates;

    if args.json {
        let json = serde_json::to_string_pretty(&plan).context("Failed to serialize plan")?;
        println!("{}", json);
    } else {
        print_plan(&plan);
    }
    Ok(())
}

async fn build_plan(blueprint: &RecorderBlueprint, channels: Vec<ChannelName>) -> Result<PoolPlan> {
    let plan = match blueprint.server.mode {
        PoolMode::Sharded => PoolPlan::sharded(
            channels,
            &blueprint.server.endpoint,
            blueprint.server.shard_size,
        ),
        PoolMode::Direct => {
            info!(url = %blueprint.server.resolver_url, "Resolving channels");
            let resolver = HttpResolver::new(blueprint.server.resolver_url.clone())
                .context("Failed to build discovery client")?;
            PoolPlan::direct(channels, Arc::new(resolver)).await
        }
    };
    Ok(plan)
}

fn print_plan(plan: &PoolPlan) {
    println!("\n=== Pool Plan ({}) ===\n", plan.mode);
    println!(
        "{} channels on {} connections\n",
        plan.channel_count(),
        plan.shards.len()
    );

    for shard in &plan.shards {
        match shard.cluster {
            Some(ref cluster) => println!(
                "{} -> {} [{}]",
                shard.connection_id(),
                shard.endpoint,
                cluster
            ),
            None => println!("{} -> {}", shard.connection_id(), shard.endpoint),
        }
        for channel in &shard.channels {
            println!("   ├─ {}", channel.join_target());
        }
    }

    if !plan.skipped.is_empty() {
        println!("\nSkipped:");
        for skipped in &plan.skipped {
            println!("   ├─ {}: {}", skipped.channel, skipped.reason);
        }
    }
    if !plan.duplicates.is_empty() {
        println!("\nDuplicates ignored:");
        for duplicate in &plan.duplicates {
            println!("   ├─ {}", duplicate);
        }
    }
    println!();
}

fn print_unresolved(plan: &UnresolvedPlan) {
    println!("\n=== Pool Plan (direct, unresolved) ===\n");
    println!(
        "{} channels, one connection each; endpoints are looked up at run time (use --resolve)\n",
        plan.channels.len()
    );
    for channel in &plan.channels {
        println!("   ├─ {}", channel.join_target());
    }
    println!();
}
