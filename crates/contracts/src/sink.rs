//! RecordSink trait - Recorder output interface
//!
//! Defines the append-only binary log abstraction owned by a connection's
//! read loop, plus the factory that opens one per connection.

use std::future::Future;

use crate::ContractError;

/// Append-only record output.
///
/// A sink is owned by exactly one read loop; implementations need no
/// internal locking.
#[trait_variant::make(RecordSink: Send)]
pub trait LocalRecordSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Append raw line bytes (possibly an unterminated tail)
    ///
    /// # Errors
    /// Returns write error (should include context)
    async fn write_line(&mut self, bytes: &[u8]) -> Result<(), ContractError>;

    /// Append a u64 little-endian nanosecond timestamp
    async fn write_timestamp(&mut self, nanos: u64) -> Result<(), ContractError>;

    /// Flush buffer (if any)
    async fn flush(&mut self) -> Result<(), ContractError>;

    /// Close sink
    async fn close(&mut self) -> Result<(), ContractError>;
}

/// Opens a fresh sink for every connection attempt.
pub trait RecordSinkFactory: Send + Sync {
    type Sink: RecordSink + 'static;

    /// Create a new sink; its open marker is already written on return.
    ///
    /// # Arguments
    /// * `connection` - Connection label, for logging only
    fn create(
        &self,
        connection: &str,
    ) -> impl Future<Output = Result<Self::Sink, ContractError>> + Send;
}
