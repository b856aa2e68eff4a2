//! # Resolver
//!
//! Server discovery for direct mode: which chat server hosts a channel.
//!
//! - [`HttpResolver`]: asks the discovery service (`GET <base>/servers?channel=<name>`)
//! - [`StaticResolver`]: fixed answers, for tests and single-endpoint setups

mod http;
mod fixed;

pub use fixed::StaticResolver;
pub use http::{HttpResolver, ServersResponse};
