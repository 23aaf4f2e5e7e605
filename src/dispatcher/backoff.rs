//! Jittered exponential delays between transport retries.

use std::time::Duration;

use rand::{Rng, SeedableRng, rngs::StdRng};

/// Shortest delay ever produced.
const MIN_SLEEP: Duration = Duration::from_millis(10);

/// Produces a growing, randomised delay for each consecutive retry.
///
/// The upper bound doubles after every call until it reaches `cap`; the
/// returned delay is drawn uniformly from `[MIN_SLEEP, bound]`.
pub(crate) struct RetryBackoff {
    bound: Duration,
    cap: Duration,
    rng: StdRng,
}

impl RetryBackoff {
    pub(crate) fn new(base: Duration, cap: Duration) -> Self {
        Self::with_rng(base, cap, StdRng::from_entropy())
    }

    pub(crate) fn with_rng(base: Duration, cap: Duration, rng: StdRng) -> Self {
        Self {
            bound: base.min(cap),
            cap,
            rng,
        }
    }

    pub(crate) fn next_sleep(&mut self) -> Duration {
        let max_ms = u64::try_from(self.bound.as_millis()).unwrap_or(u64::MAX);
        let min_ms = u64::try_from(MIN_SLEEP.as_millis()).unwrap_or(0);
        let sleep_ms = if max_ms <= min_ms {
            max_ms.max(1)
        } else {
            self.rng.gen_range(min_ms..=max_ms)
        };
        self.bound = self.bound.saturating_mul(2).min(self.cap);
        Duration::from_millis(sleep_ms)
    }
}
