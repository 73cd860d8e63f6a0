//! Retry schedule.

use std::time::Duration;

/// Default number of attempts per call
pub const DEFAULT_RETRIES: u32 = 3;

/// Default delay step between attempts
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(50);

/// Delay before attempt `attempt` (zero-based): `attempt * base`.
///
/// The first attempt never waits.
pub fn delay_for(attempt: u32, base: Duration) -> Duration {
    base.saturating_mul(attempt)
}

/// How many attempts a call makes and how far apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub retries: u32,
    /// Delay step
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { retries: DEFAULT_RETRIES, base_delay: DEFAULT_BASE_DELAY }
    }
}

impl RetryPolicy {
    /// Policy with `retries` attempts spaced by `base_delay` steps.
    pub fn new(retries: u32, base_delay: Duration) -> Self {
        Self { retries, base_delay }
    }

    /// Delay before attempt `attempt`.
    pub fn delay(&self, attempt: u32) -> Duration {
        delay_for(attempt, self.base_delay)
    }

    /// Delays before each attempt, in order.
    pub fn schedule(&self) -> impl Iterator<Item = Duration> + '_ {
        (0..self.retries).map(|attempt| self.delay(attempt))
    }
}
