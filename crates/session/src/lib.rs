//! # Session
//!
//! One physical connection to a chat server.
//!
//! A [`Connector`] dials an endpoint, opens a fresh log file, performs the
//! anonymous login handshake and then drives four loops together:
//!
//! - read loop: frames the inbound stream into the log (sole sink owner)
//! - join loop: drains the bounded JOIN queue through a [`TokenBucket`]
//! - keepalive loop: periodic `PONG`
//! - writer: the only task that touches the socket's write half
//!
//! The first loop to fail cancels its siblings. The outcome is reported
//! through [`ConnectionHandle::wait`].

mod command;
mod connection;
mod dialer;
mod error;
mod metrics;
mod pacer;
mod settings;
mod writer;

pub use command::Command;
pub use connection::{ConnectionHandle, ConnectionState, ConnectionSummary, Connector};
pub use dialer::{Dialer, DuplexDialer, TcpDialer};
pub use error::SessionError;
pub use metrics::{ConnectionMetrics, ConnectionMetricsSnapshot};
pub use pacer::TokenBucket;
pub use settings::SessionSettings;
pub use writer::{command_channel, CommandSender, CommandWriter, Outgoing};
