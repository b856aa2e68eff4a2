//! Endpoint - remote `host:port` pair and resolver output

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::ContractError;

/// Remote chat server address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Address string accepted by `TcpStream::connect`.
    pub fn authority(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl FromStr for Endpoint {
    type Err = ContractError;

    /// Parse `host:port`; IPv6 hosts must be bracketed (`[::1]:6667`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| ContractError::invalid_endpoint(s, "expected host:port"))?;

        let host = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host);
        if host.is_empty() {
            return Err(ContractError::invalid_endpoint(s, "empty host"));
        }

        let port = port
            .parse::<u16>()
            .map_err(|e| ContractError::invalid_endpoint(s, format!("bad port: {e}")))?;

        Ok(Self::new(host, port))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.authority())
    }
}

impl Serialize for Endpoint {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.authority())
    }
}

impl<'de> Deserialize<'de> for Endpoint {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// Resolver answer for one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedServer {
    /// Cluster label reported by the discovery service (informational).
    pub cluster: String,
    /// Candidate endpoints, best first. Only the first one is used.
    pub endpoints: Vec<Endpoint>,
}

impl ResolvedServer {
    pub fn primary(&self) -> Option<&Endpoint> {
        self.endpoints.first()
    }
}
