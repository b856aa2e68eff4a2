//! Per-connection settings derived from the blueprint

use std::time::Duration;

use contracts::RecorderBlueprint;

/// Everything a connection needs from the configuration
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub nick: String,
    pub capabilities: Vec<String>,
    pub join_interval: Duration,
    pub join_burst: u32,
    pub join_queue_capacity: usize,
    pub keepalive_interval: Duration,
    pub keepalive_target: String,
    pub connect_timeout: Duration,
    pub read_buffer_size: usize,
    /// Flush cadence for the log file while lines arrive
    pub flush_interval: Duration,
}

impl From<&RecorderBlueprint> for SessionSettings {
    fn from(blueprint: &RecorderBlueprint) -> Self {
        Self {
            nick: blueprint.login.nick.clone(),
            capabilities: blueprint.login.capabilities.clone(),
            join_interval: blueprint.timing.join_interval(),
            join_burst: blueprint.timing.join_burst,
            join_queue_capacity: blueprint.timing.join_queue_capacity,
            keepalive_interval: blueprint.timing.keepalive_interval(),
            keepalive_target: blueprint.timing.keepalive_target.clone(),
            connect_timeout: blueprint.timing.connect_timeout(),
            read_buffer_size: blueprint.output.read_buffer_size,
            flush_interval: blueprint.output.flush_interval(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from(&RecorderBlueprint::default())
    }
}
