//! Retry policy for catalog requests

use super::MetadataRetrievalError;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

/// How often and how patiently a catalog request is repeated.
///
/// Only errors that report themselves as retryable are repeated; a terminal
/// answer such as "not found" is returned immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one (at least 1)
    max_attempts: u32,
    /// Pause before attempt `n + 1` is `delay * n`
    delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::ZERO)
    }
}

impl RetryPolicy {
    /// Creates a policy with linear backoff. `max_attempts` is clamped to 1.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// A policy that never retries.
    pub fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Pause to take after the given (1-based) failed attempt.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.delay.saturating_mul(attempt)
    }

    /// Runs `operation` until it succeeds, fails terminally, or the attempts
    /// are used up. The closure receives the 1-based attempt number.
    pub fn run<T, F>(&self, mut operation: F) -> Result<T, MetadataRetrievalError>
    where
        F: FnMut(u32) -> Result<T, MetadataRetrievalError>,
    {
        let mut attempt = 1;
        loop {
            match operation(attempt) {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    let pause = self.backoff(attempt);
                    debug!(attempt, error = %e, ?pause, "retrying catalog request");
                    if !pause.is_zero() {
                        thread::sleep(pause);
                    }
                    attempt += 1;
                }
                Err(e) => {
                    if e.is_retryable() {
                        warn!(attempts = attempt, error = %e, "giving up on catalog request");
                    }
                    return Err(e);
                }
            }
        }
    }
}
