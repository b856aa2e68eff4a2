//! RecorderBlueprint - Config Loader output
//!
//! Describes the complete recorder setup: which channels to log, how to
//! reach the servers, login handshake, pacing and output layout.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::Endpoint;

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete recorder configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecorderBlueprint {
    /// Config version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Raw channel names; normalized (and blanks dropped) at plan time
    #[serde(default)]
    pub channels: Vec<String>,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub login: LoginConfig,

    #[serde(default)]
    pub timing: TimingConfig,

    #[serde(default)]
    pub reconnect: ReconnectConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

/// How channels are spread over connections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolMode {
    /// One connection per channel, endpoint resolved per channel
    Direct,
    /// ceil(N / shard_size) connections to one fixed endpoint
    #[default]
    Sharded,
}

impl std::fmt::Display for PoolMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Direct => f.write_str("direct"),
            Self::Sharded => f.write_str("sharded"),
        }
    }
}

/// Server selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub mode: PoolMode,

    /// Fixed endpoint used in sharded mode
    #[serde(default = "default_endpoint")]
    pub endpoint: Endpoint,

    /// Discovery service base URL used in direct mode
    #[serde(default = "default_resolver_url")]
    pub resolver_url: String,

    /// Channels per connection in sharded mode
    #[serde(default = "default_shard_size")]
    pub shard_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            mode: PoolMode::default(),
            endpoint: default_endpoint(),
            resolver_url: default_resolver_url(),
            shard_size: default_shard_size(),
        }
    }
}

fn default_endpoint() -> Endpoint {
    Endpoint::new("irc.chat.twitch.tv", 6667)
}

fn default_resolver_url() -> String {
    "http://tmi.twitch.tv".to_string()
}

fn default_shard_size() -> usize {
    100
}

/// Anonymous login handshake
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginConfig {
    /// Sent lower-cased as both USER and NICK
    #[serde(default = "default_nick")]
    pub nick: String,

    /// One `CAP REQ :<cap>` per entry, in order
    #[serde(default = "default_capabilities")]
    pub capabilities: Vec<String>,
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            nick: default_nick(),
            capabilities: default_capabilities(),
        }
    }
}

fn default_nick() -> String {
    "justinfan0".to_string()
}

fn default_capabilities() -> Vec<String> {
    vec![
        "twitch.tv/tags".to_string(),
        "twitch.tv/commands".to_string(),
        "twitch.tv/membership".to_string(),
    ]
}

/// Pacing and keepalive
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Minimum spacing between JOIN commands on one connection
    #[serde(default = "default_join_interval_ms")]
    pub join_interval_ms: u64,

    /// Token bucket capacity; 1 means strict spacing
    #[serde(default = "default_join_burst")]
    pub join_burst: u32,

    /// Pending JOIN requests per connection before enqueue blocks
    #[serde(default = "default_join_queue_capacity")]
    pub join_queue_capacity: usize,

    #[serde(default = "default_keepalive_interval_secs")]
    pub keepalive_interval_secs: u64,

    /// Argument of the proactive PONG command
    #[serde(default = "default_keepalive_target")]
    pub keepalive_target: String,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl TimingConfig {
    pub fn join_interval(&self) -> Duration {
        Duration::from_millis(self.join_interval_ms)
    }

    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_secs(self.keepalive_interval_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            join_interval_ms: default_join_interval_ms(),
            join_burst: default_join_burst(),
            join_queue_capacity: default_join_queue_capacity(),
            keepalive_interval_secs: default_keepalive_interval_secs(),
            keepalive_target: default_keepalive_target(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

fn default_join_interval_ms() -> u64 {
    1000
}

fn default_join_burst() -> u32 {
    1
}

fn default_join_queue_capacity() -> usize {
    100
}

fn default_keepalive_interval_secs() -> u64 {
    10
}

fn default_keepalive_target() -> String {
    "tmi.twitch.tv".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

/// Reconnect policy for failed connections
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectConfig {
    /// Consecutive failed attempts before a shard is given up (0 = never retry)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Multiplicative growth factor, >= 1.0
    #[serde(default = "default_backoff_factor")]
    pub factor: f64,

    /// Uptime after which a connection counts as healthy and the failure
    /// count starts over
    #[serde(default = "default_stable_after_secs")]
    pub stable_after_secs: u64,
}

impl ReconnectConfig {
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }

    pub fn stable_after(&self) -> Duration {
        Duration::from_secs(self.stable_after_secs)
    }
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            factor: default_backoff_factor(),
            stable_after_secs: default_stable_after_secs(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    500
}

fn default_max_backoff_ms() -> u64 {
    30_000
}

fn default_backoff_factor() -> f64 {
    2.0
}

fn default_stable_after_secs() -> u64 {
    30
}

/// Log file layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_directory")]
    pub directory: PathBuf,

    /// Files are named `<prefix>-<creation_nanos>.<extension>`
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,

    #[serde(default = "default_file_extension")]
    pub file_extension: String,

    /// Receive buffer size for one socket read
    #[serde(default = "default_read_buffer_size")]
    pub read_buffer_size: usize,

    /// How often buffered log bytes are pushed to the file while traffic
    /// flows
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,
}

impl OutputConfig {
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_directory(),
            file_prefix: default_file_prefix(),
            file_extension: default_file_extension(),
            read_buffer_size: default_read_buffer_size(),
            flush_interval_ms: default_flush_interval_ms(),
        }
    }
}

fn default_directory() -> PathBuf {
    PathBuf::from(".")
}

fn default_file_prefix() -> String {
    "twitch".to_string()
}

fn default_file_extension() -> String {
    "txt".to_string()
}

fn default_read_buffer_size() -> usize {
    4096
}

fn default_flush_interval_ms() -> u64 {
    1000
}
