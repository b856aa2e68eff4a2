//! Dispatcher error types

use contracts::{ChannelName, ContractError};
use session::SessionError;
use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Discovery failed for a channel (direct mode)
    #[error("cannot resolve '{channel}': {source}")]
    Resolve {
        channel: ChannelName,
        #[source]
        source: ContractError,
    },

    /// Discovery answered without any usable server
    #[error("no server listed for '{channel}'")]
    NoEndpoint { channel: ChannelName },

    #[error(transparent)]
    Session(#[from] SessionError),

    /// Shard gave up after consecutive failures
    #[error("shard {shard} gave up after {attempts} attempts: {last}")]
    Exhausted {
        shard: usize,
        attempts: u32,
        #[source]
        last: SessionError,
    },
}

impl DispatcherError {
    /// Short label for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Resolve { .. } => "resolve",
            Self::NoEndpoint { .. } => "no_endpoint",
            Self::Session(e) => e.kind(),
            Self::Exhausted { .. } => "exhausted",
        }
    }
}
