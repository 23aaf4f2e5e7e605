//! Rate limiting for dropped-event warnings.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Default spacing between two drop warnings.
pub const WARN_INTERVAL: Duration = Duration::from_secs(5);

/// Counts dropped events and reports them at most once per interval.
///
/// Callers bump the counter with [`record_drop`](Self::record_drop) and then
/// call [`warn_if_due`](Self::warn_if_due); the callback receives the number
/// of drops accumulated since the previous warning.
pub struct RateLimitedWarner {
    interval: Duration,
    dropped: AtomicU64,
    last_warn: Mutex<Option<Instant>>,
}

impl RateLimitedWarner {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            dropped: AtomicU64::new(0),
            last_warn: Mutex::new(None),
        }
    }

    pub fn record_drop(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn warn_if_due(&self, warn: impl FnOnce(u64)) {
        let now = Instant::now();
        let mut last = self.last_warn.lock();
        if last.is_some_and(|at| now.duration_since(at) < self.interval) {
            return;
        }
        let count = self.dropped.swap(0, Ordering::Relaxed);
        if count > 0 {
            *last = Some(now);
            warn(count);
        }
    }

    /// Report pending drops regardless of the interval.
    pub fn flush(&self, warn: impl FnOnce(u64)) {
        let count = self.dropped.swap(0, Ordering::Relaxed);
        if count > 0 {
            *self.last_warn.lock() = Some(Instant::now());
            warn(count);
        }
    }
}

impl Default for RateLimitedWarner {
    fn default() -> Self {
        Self::new(WARN_INTERVAL)
    }
}
