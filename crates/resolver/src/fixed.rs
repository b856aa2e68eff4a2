//! StaticResolver - answers from a fixed table

use std::collections::{HashMap, HashSet};

use contracts::{ChannelName, ChannelResolver, ContractError, Endpoint, ResolvedServer};

/// Resolver with a default answer plus per-channel routes and rejections
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    default: Option<ResolvedServer>,
    routes: HashMap<String, ResolvedServer>,
    rejected: HashSet<String>,
}

impl StaticResolver {
    /// Every channel resolves to `endpoint`
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            default: Some(ResolvedServer {
                cluster: "static".to_string(),
                endpoints: vec![endpoint],
            }),
            ..Self::default()
        }
    }

    /// Only explicitly routed channels resolve
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn route(mut self, channel: &str, server: ResolvedServer) -> Self {
        if let Some(name) = ChannelName::parse(channel) {
            self.routes.insert(name.as_str().to_string(), server);
        }
        self
    }

    /// Resolution of `channel` fails
    pub fn reject(mut self, channel: &str) -> Self {
        if let Some(name) = ChannelName::parse(channel) {
            self.rejected.insert(name.as_str().to_string());
        }
        self
    }
}

impl ChannelResolver for StaticResolver {
    async fn resolve(&self, channel: &ChannelName) -> Result<ResolvedServer, ContractError> {
        if self.rejected.contains(channel.as_str()) {
            return Err(ContractError::resolve(channel.as_str(), "rejected"));
        }
        self.routes
            .get(channel.as_str())
            .or(self.default.as_ref())
            .cloned()
            .ok_or_else(|| ContractError::resolve(channel.as_str(), "no route"))
    }
}
