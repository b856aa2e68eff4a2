//! Reconnect backoff
//!
//! The delay before retry `n` (0-indexed) is `first × factor^n`, clamped to
//! `max`.

use std::time::Duration;

use contracts::ReconnectConfig;

/// Retry delay growth
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    pub first: Duration,
    pub max: Duration,
    pub factor: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::from(&ReconnectConfig::default())
    }
}

impl From<&ReconnectConfig> for BackoffPolicy {
    fn from(config: &ReconnectConfig) -> Self {
        Self {
            first: config.initial_backoff(),
            max: config.max_backoff(),
            factor: config.factor,
        }
    }
}

impl BackoffPolicy {
    pub fn next(&self, attempt: u32) -> Duration {
        let exp = attempt.min(i32::MAX as u32) as i32;
        let secs = self.first.as_secs_f64() * self.factor.powi(exp);

        if !secs.is_finite() || secs < 0.0 || secs > self.max.as_secs_f64() {
            self.max
        } else {
            Duration::from_secs_f64(secs)
        }
    }
}

/// How a shard retries its connection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconnectPolicy {
    pub backoff: BackoffPolicy,
    /// Consecutive failed attempts before the shard is given up
    pub max_attempts: u32,
    /// A connection must stay up this long to reset the failure count
    pub stable_after: Duration,
}

impl ReconnectPolicy {
    /// Whether a connection that lived for `uptime` clears earlier failures
    pub fn is_stable(&self, uptime: Duration) -> bool {
        uptime >= self.stable_after
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::from(&ReconnectConfig::default())
    }
}

impl From<&ReconnectConfig> for ReconnectPolicy {
    fn from(config: &ReconnectConfig) -> Self {
        Self {
            backoff: BackoffPolicy::from(config),
            max_attempts: config.max_attempts.max(1),
            stable_after: config.stable_after(),
        }
    }
}
