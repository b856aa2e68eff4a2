//! Token bucket flood control for outgoing JOINs

use std::time::Duration;

use tokio::time::{sleep_until, Instant};

/// Token bucket over `tokio::time`.
///
/// Starts full. One token is earned per `interval` up to `capacity`; with
/// capacity 1 consecutive acquisitions are at least `interval` apart.
#[derive(Debug)]
pub struct TokenBucket {
    capacity: u32,
    interval: Duration,
    available: u32,
    last_refill: Instant,
}

impl TokenBucket {
    pub fn new(capacity: u32, interval: Duration) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            interval,
            available: capacity,
            last_refill: Instant::now(),
        }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Tokens available right now
    pub fn available(&mut self) -> u32 {
        self.refill(Instant::now());
        self.available
    }

    /// Take a token if one is available
    pub fn try_acquire(&mut self) -> bool {
        self.refill(Instant::now());
        if self.available == 0 {
            return false;
        }
        self.available -= 1;
        true
    }

    /// Wait for a token and take it. Cancel-safe.
    pub async fn acquire(&mut self) {
        while !self.try_acquire() {
            sleep_until(self.last_refill + self.interval).await;
        }
    }

    /// Restart the refill clock at `now`, typically when the paced action
    /// has actually completed. The next token is earned one full interval
    /// later.
    pub fn restart_refill(&mut self, now: Instant) {
        self.refill(now);
        if self.available < self.capacity {
            self.last_refill = now;
        }
    }

    fn refill(&mut self, now: Instant) {
        if self.available >= self.capacity || self.interval.is_zero() {
            self.available = self.capacity;
            self.last_refill = now;
            return;
        }

        let elapsed = now.saturating_duration_since(self.last_refill);
        let earned = elapsed.as_nanos() / self.interval.as_nanos();
        if earned == 0 {
            return;
        }

        let earned = earned.min(u128::from(self.capacity)) as u32;
        self.available = (self.available + earned).min(self.capacity);
        if self.available == self.capacity {
            self.last_refill = now;
        } else {
            self.last_refill += self.interval * earned;
        }
    }
}
