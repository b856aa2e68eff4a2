//! Connection errors

use std::time::Duration;

use contracts::{ChannelName, ContractError};
use thiserror::Error;

/// Why a connection could not be established or stopped running
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("connect to {endpoint} failed: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    #[error("connect to {endpoint} timed out after {timeout:?}")]
    ConnectTimeout { endpoint: String, timeout: Duration },

    #[error("failed to open log file: {0}")]
    FileCreate(#[source] ContractError),

    #[error("read failed on {connection}: {source}")]
    Read {
        connection: String,
        #[source]
        source: std::io::Error,
    },

    /// Peer closed the stream
    #[error("server closed {connection}")]
    Closed { connection: String },

    #[error("write failed on {connection}: {source}")]
    Write {
        connection: String,
        #[source]
        source: std::io::Error,
    },

    /// The log sink rejected a write
    #[error("log write failed on {connection}: {source}")]
    Sink {
        connection: String,
        #[source]
        source: ContractError,
    },

    #[error("command writer stopped")]
    WriterClosed,

    #[error("join queue closed, '{channel}' not joined")]
    QueueClosed { channel: ChannelName },

    #[error("cancelled")]
    Cancelled,

    #[error("connection task {connection} panicked: {message}")]
    Panicked { connection: String, message: String },
}

impl SessionError {
    /// Short label for metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connect { .. } => "connect",
            Self::ConnectTimeout { .. } => "connect_timeout",
            Self::FileCreate(_) => "file_create",
            Self::Read { .. } => "read",
            Self::Closed { .. } => "closed",
            Self::Write { .. } => "write",
            Self::Sink { .. } => "sink",
            Self::WriterClosed => "writer_closed",
            Self::QueueClosed { .. } => "queue_closed",
            Self::Cancelled => "cancelled",
            Self::Panicked { .. } => "panicked",
        }
    }

    /// Error raised before the connection became active
    pub fn is_establish_failure(&self) -> bool {
        matches!(
            self,
            Self::Connect { .. } | Self::ConnectTimeout { .. } | Self::FileCreate(_)
        )
    }
}
