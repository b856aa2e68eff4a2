//! Pool planning
//!
//! Assigns channels to physical connections once, before anything is
//! dialed. Plans are never re-balanced.

use std::sync::Arc;

use contracts::{ChannelName, ChannelResolver, Endpoint, PoolMode};
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{error, info, instrument, warn};

use crate::DispatcherError;

/// Channels served by one connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShardPlan {
    pub index: usize,
    pub endpoint: Endpoint,
    /// Cluster label from discovery (direct mode only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster: Option<String>,
    /// Join order
    pub channels: Vec<ChannelName>,
}

impl ShardPlan {
    /// Connection label used in logs and file factories
    pub fn connection_id(&self) -> String {
        format!("shard-{}", self.index)
    }
}

/// A channel left out of the plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedChannel {
    pub channel: ChannelName,
    pub reason: String,
}

/// Full assignment of channels to connections
#[derive(Debug, Clone, Serialize)]
pub struct PoolPlan {
    pub mode: PoolMode,
    pub shards: Vec<ShardPlan>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedChannel>,
    /// Inputs dropped because they normalize to an earlier channel
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub duplicates: Vec<ChannelName>,
}

impl PoolPlan {
    /// `ceil(C / shard_size)` shards on one endpoint; channel `i` goes to
    /// shard `i mod shard_count`.
    pub fn sharded(channels: Vec<ChannelName>, endpoint: &Endpoint, shard_size: usize) -> Self {
        let shard_count = channels.len().div_ceil(shard_size.max(1));
        let mut shards: Vec<ShardPlan> = (0..shard_count)
            .map(|index| ShardPlan {
                index,
                endpoint: endpoint.clone(),
                cluster: None,
                channels: Vec::with_capacity(shard_size.min(channels.len())),
            })
            .collect();

        for (i, channel) in channels.into_iter().enumerate() {
            shards[i % shard_count].channels.push(channel);
        }

        for shard in &shards {
            info!(
                shard = shard.index,
                endpoint = %shard.endpoint,
                channels = shard.channels.len(),
                "Shard planned"
            );
        }

        Self {
            mode: PoolMode::Sharded,
            shards,
            skipped: Vec::new(),
            duplicates: Vec::new(),
        }
    }

    /// One shard per channel, on the first server discovery lists for it.
    ///
    /// All channels are resolved concurrently; the plan keeps input order.
    /// Channels that fail to resolve are skipped, not fatal.
    #[instrument(name = "plan_direct", skip_all, fields(channels = channels.len()))]
    pub async fn direct<R>(channels: Vec<ChannelName>, resolver: Arc<R>) -> Self
    where
        R: ChannelResolver + 'static,
    {
        let mut lookups = JoinSet::new();
        for (position, channel) in channels.iter().cloned().enumerate() {
            let resolver = Arc::clone(&resolver);
            lookups.spawn(async move {
                let resolved = resolver.resolve(&channel).await;
                (position, resolved)
            });
        }

        let mut answers: Vec<Option<_>> = (0..channels.len()).map(|_| None).collect();
        while let Some(joined) = lookups.join_next().await {
            match joined {
                Ok((position, resolved)) => answers[position] = Some(resolved),
                Err(e) => error!(error = %e, "Resolver task failed"),
            }
        }

        let mut shards = Vec::new();
        let mut skipped = Vec::new();
        for (channel, answer) in channels.into_iter().zip(answers) {
            let outcome = match answer {
                Some(Ok(resolved)) => match resolved.primary().cloned() {
                    Some(endpoint) => Ok((endpoint, resolved.cluster)),
                    None => Err(DispatcherError::NoEndpoint {
                        channel: channel.clone(),
                    }),
                },
                Some(Err(source)) => Err(DispatcherError::Resolve {
                    channel: channel.clone(),
                    source,
                }),
                None => Err(DispatcherError::Resolve {
                    channel: channel.clone(),
                    source: contracts::ContractError::resolve(
                        channel.as_str(),
                        "resolver task aborted",
                    ),
                }),
            };

            match outcome {
                Ok((endpoint, cluster)) => {
                    info!(
                        channel = %channel.join_target(),
                        endpoint = %endpoint,
                        cluster = %cluster,
                        "Channel assigned"
                    );
                    shards.push(ShardPlan {
                        index: shards.len(),
                        endpoint,
                        cluster: Some(cluster),
                        channels: vec![channel],
                    });
                }
                Err(e) => {
                    warn!(channel = %channel, error = %e, "Skipping channel");
                    observability::record_channel_skipped(e.kind());
                    skipped.push(SkippedChannel {
                        channel,
                        reason: e.to_string(),
                    });
                }
            }
        }

        Self {
            mode: PoolMode::Direct,
            shards,
            skipped,
            duplicates: Vec::new(),
        }
    }

    pub fn channel_count(&self) -> usize {
        self.shards.iter().map(|s| s.channels.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::ResolvedServer;
    use resolver::StaticResolver;
    use std::collections::HashSet;

    fn channels(n: usize) -> Vec<ChannelName> {
        (0..n)
            .map(|i| ChannelName::parse(&format!("chan{i}")).unwrap())
            .collect()
    }

    fn endpoint() -> Endpoint {
        Endpoint::new("irc.example", 6667)
    }

    #[test]
    fn test_sharded_counts() {
        assert_eq!(PoolPlan::sharded(channels(250), &endpoint(), 100).shards.len(), 3);
        assert_eq!(PoolPlan::sharded(channels(200), &endpoint(), 100).shards.len(), 2);
        assert_eq!(PoolPlan::sharded(channels(1), &endpoint(), 100).shards.len(), 1);
        assert!(PoolPlan::sharded(Vec::new(), &endpoint(), 100).is_empty());
    }

    #[test]
    fn test_sharded_assignment_is_modular_and_complete() {
        let input = channels(250);
        let plan = PoolPlan::sharded(input.clone(), &endpoint(), 100);
        let shard_count = plan.shards.len();

        for (i, channel) in input.iter().enumerate() {
            let owners: Vec<usize> = plan
                .shards
                .iter()
                .filter(|s| s.channels.contains(channel))
                .map(|s| s.index)
                .collect();
            assert_eq!(owners, vec![i % shard_count]);
        }

        for shard in &plan.shards {
            assert!(shard.channels.len() <= 100);
            assert_eq!(shard.endpoint, endpoint());
        }
        assert_eq!(plan.channel_count(), 250);
    }

    #[test]
    fn test_sharded_keeps_order_within_shard() {
        let plan = PoolPlan::sharded(channels(5), &endpoint(), 2);
        let names: Vec<&str> = plan.shards[0].channels.iter().map(|c| c.as_str()).collect();
        assert_eq!(names, ["chan0", "chan3"]);
    }

    #[tokio::test]
    async fn test_direct_resolves_each_channel() {
        let other = ResolvedServer {
            cluster: "b".into(),
            endpoints: vec![Endpoint::new("other.example", 6697)],
        };
        let resolver = StaticResolver::new(endpoint())
            .route("chan1", other)
            .reject("chan2")
            .route(
                "chan3",
                ResolvedServer {
                    cluster: "c".into(),
                    endpoints: Vec::new(),
                },
            );

        let plan = PoolPlan::direct(channels(5), Arc::new(resolver)).await;

        let assigned: Vec<(&str, String)> = plan
            .shards
            .iter()
            .map(|s| (s.channels[0].as_str(), s.endpoint.to_string()))
            .collect();
        assert_eq!(
            assigned,
            [
                ("chan0", "irc.example:6667".to_string()),
                ("chan1", "other.example:6697".to_string()),
                ("chan4", "irc.example:6667".to_string()),
            ]
        );
        let indices: HashSet<usize> = plan.shards.iter().map(|s| s.index).collect();
        assert_eq!(indices, HashSet::from([0, 1, 2]));

        let skipped: Vec<&str> = plan.skipped.iter().map(|s| s.channel.as_str()).collect();
        assert_eq!(skipped, ["chan2", "chan3"]);
        assert!(plan.skipped[1].reason.contains("no server"));
    }

    #[test]
    fn test_plan_serializes() {
        let plan = PoolPlan::sharded(channels(2), &endpoint(), 100);
        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json["mode"], "sharded");
        assert_eq!(json["shards"][0]["endpoint"], "irc.example:6667");
        assert_eq!(json["shards"][0]["channels"][1], "chan1");
        assert!(json.get("skipped").is_none());
    }
}
