//! Human-readable pool report.

use dispatcher::{PoolReport, ShardOutcome};
use std::time::Duration;

/// Print the final report of a recording run
pub fn print_report(report: &PoolReport, elapsed: Duration) {
    let totals = report.totals();
    let secs = elapsed.as_secs_f64();
    let rate = if secs > 0.0 {
        totals.lines_recorded as f64 / secs
    } else {
        0.0
    };

    println!("\n=== Recording Summary ===\n");
    println!("Overview");
    println!("   ├─ Mode: {}", report.mode);
    println!("   ├─ Duration: {secs:.2}s");
    println!("   ├─ Shards: {}", report.shards.len());
    println!("   ├─ Connections opened: {}", report.connections_opened());
    println!("   └─ Reconnects: {}", report.pool.reconnects);

    println!("\nTraffic");
    println!("   ├─ Lines recorded: {}", totals.lines_recorded);
    println!("   ├─ Bytes recorded: {}", totals.bytes_recorded);
    println!("   ├─ Lines/s: {rate:.2}");
    println!("   ├─ JOINs sent: {}", totals.joins_sent);
    println!("   └─ Keepalives sent: {}", totals.keepalives_sent);

    if report.failed_shards().next().is_some() {
        println!("\nFailed shards");
        for shard in report.failed_shards() {
            if let ShardOutcome::Failed(ref error) = shard.outcome {
                println!("   ├─ shard-{} ({}): {}", shard.index, shard.endpoint, error);
            }
        }
    }

    if !report.skipped.is_empty() {
        println!("\nSkipped channels");
        for skipped in &report.skipped {
            println!("   ├─ {}: {}", skipped.channel, skipped.reason);
        }
    }

    println!();
}
