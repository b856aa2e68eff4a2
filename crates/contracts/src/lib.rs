//! # Contracts
//!
//! Frozen interface contracts shared by every recorder crate: channel and
//! endpoint types, the configuration blueprint, and the traits at the
//! seams (record sinks, resolvers, clocks).
//! All business crates depend on this crate, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Record timestamps are u64 nanoseconds since the Unix epoch, little-endian on disk
//! - A [`Clock`] must never go backwards

mod blueprint;
mod channel;
mod clock;
mod endpoint;
mod error;
mod resolver;
mod sink;

pub use blueprint::*;
pub use channel::{normalize_channels, ChannelName};
pub use clock::Clock;
pub use endpoint::{Endpoint, ResolvedServer};
pub use error::*;
pub use resolver::ChannelResolver;
pub use sink::*;
