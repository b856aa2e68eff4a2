//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use contracts::{Endpoint, PoolMode};
use std::path::PathBuf;

/// Chat Recorder - tee a chat network's wire protocol to timestamped logs
#[derive(Parser, Debug)]
#[command(
    name = "chat-recorder",
    author,
    version,
    about = "Record chat channels' raw wire protocol with nanosecond timestamps",
    long_about = "Connects to the chat network, joins the requested channels with flood \n\
                  control and writes every received protocol line to a binary log, \n\
                  each line followed by a little-endian u64 nanosecond timestamp."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "CHAT_RECORDER_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "compact",
        global = true,
        env = "CHAT_RECORDER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Record channels until stopped
    Run(RunArgs),

    /// Validate a configuration file without connecting
    Validate(ValidateArgs),

    /// Show how channels would be assigned to connections
    Plan(PlanArgs),
}

/// Options shared by commands that build a pool
#[derive(Args, Debug, Clone, Default)]
pub struct PoolArgs {
    /// Channels to record (appended after the config file's channels)
    pub channels: Vec<String>,

    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, env = "CHAT_RECORDER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the pool mode
    #[arg(long, value_enum, env = "CHAT_RECORDER_MODE")]
    pub mode: Option<ModeArg>,

    /// Override the sharded-mode endpoint (host:port)
    #[arg(long, env = "CHAT_RECORDER_ENDPOINT")]
    pub endpoint: Option<Endpoint>,

    /// Override channels per connection in sharded mode
    #[arg(long, env = "CHAT_RECORDER_SHARD_SIZE")]
    pub shard_size: Option<usize>,

    /// Override the discovery service base URL
    #[arg(long, env = "CHAT_RECORDER_RESOLVER_URL")]
    pub resolver_url: Option<String>,
}

/// Arguments for the `run` command
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub pool: PoolArgs,

    /// Override the log output directory
    #[arg(short, long, env = "CHAT_RECORDER_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "CHAT_RECORDER_METRICS_PORT")]
    pub metrics_port: u16,

    /// Stop after this many seconds (0 = run until interrupted)
    #[arg(long, default_value = "0", env = "CHAT_RECORDER_TIMEOUT")]
    pub timeout: u64,
}

/// Arguments for the `validate` command
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "recorder.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `plan` command
#[derive(Args, Debug)]
pub struct PlanArgs {
    #[command(flatten)]
    pub pool: PoolArgs,

    /// Query the discovery service in direct mode
    #[arg(long)]
    pub resolve: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Pool mode as a CLI value
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModeArg {
    Direct,
    Sharded,
}

impl From<ModeArg> for PoolMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Direct => PoolMode::Direct,
            ModeArg::Sharded => PoolMode::Sharded,
        }
    }
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    Pretty,
    /// Compact single-line format
    #[default]
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
