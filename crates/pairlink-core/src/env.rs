//! Environment abstraction.
//!
//! Retry backoff, metrics timestamps and resume challenges all go through this
//! trait. Production uses [`SystemEnv`]; tests substitute an environment that
//! records sleeps instead of performing them.

use std::{
    future::Future,
    time::{Duration, Instant},
};

/// Source of time, delay and randomness.
pub trait Environment: Clone + Send + Sync + 'static {
    /// Current instant.
    fn now(&self) -> Instant;

    /// Wait for `duration`.
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;

    /// Fill `buffer` with cryptographically secure random bytes.
    fn random_bytes(&self, buffer: &mut [u8]);
}

/// Wall clock, tokio timer, OS RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl Environment for SystemEnv {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        async move {
            if !duration.is_zero() {
                tokio::time::sleep(duration).await;
            }
        }
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        use rand::RngCore;
        rand::rngs::OsRng.fill_bytes(buffer);
    }
}
