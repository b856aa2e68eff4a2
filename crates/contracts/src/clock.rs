//! Clock trait - timestamp source for log records

/// Nanosecond timestamp source.
///
/// Values must be non-decreasing across calls on the same clock.
pub trait Clock: Send + Sync {
    /// Current time as nanoseconds since the Unix epoch.
    fn now_nanos(&self) -> u64;
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now_nanos(&self) -> u64 {
        (**self).now_nanos()
    }
}
