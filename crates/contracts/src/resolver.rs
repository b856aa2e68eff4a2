//! ChannelResolver trait - server discovery interface

use std::future::Future;

use crate::{ChannelName, ContractError, ResolvedServer};

/// Looks up which chat servers host a channel.
///
/// Implementations must be cheap to share behind an `Arc`; the dispatcher
/// calls `resolve` concurrently for independent channels.
pub trait ChannelResolver: Send + Sync {
    /// Resolve a channel to its cluster label and ordered endpoint candidates.
    ///
    /// # Errors
    /// `ContractError::Resolve` when the service is unreachable or the
    /// response is malformed.
    fn resolve(
        &self,
        channel: &ChannelName,
    ) -> impl Future<Output = Result<ResolvedServer, ContractError>> + Send;
}
