//! Retry strategies for HTTP requests.

use rand::Rng;
use std::time::Duration;

/// Attempts per request, including the first one.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 4;

/// Upper bound on any single backoff wait.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_millis(20_000);

/// Exclusive upper bound of the random jitter added to each wait, in ms.
pub const DEFAULT_JITTER_MS: u64 = 1_000;

/// Strategy for retrying failed requests.
///
/// The wait before retry `n` (1-based, so the first retry is `n = 1`) is
/// `min(2^n ms + jitter, max_delay)` with jitter drawn from `0..jitter_ms`.
#[derive(Debug, Clone)]
pub struct RetryStrategy {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Maximum wait between attempts.
    pub max_delay: Duration,
    /// Exclusive upper bound of the jitter in milliseconds.
    pub jitter_ms: u64,
}

impl RetryStrategy {
    /// Creates a new retry strategy.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            max_delay: DEFAULT_MAX_DELAY,
            jitter_ms: DEFAULT_JITTER_MS,
        }
    }

    /// Disables retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            max_delay: Duration::ZERO,
            jitter_ms: 0,
        }
    }

    /// Sets the maximum wait.
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Sets the jitter bound.
    pub fn with_jitter_ms(mut self, jitter_ms: u64) -> Self {
        self.jitter_ms = jitter_ms;
        self
    }

    /// Attempts allowed, never less than one.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Returns true if another attempt may follow attempt number `attempt`.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.attempts()
    }

    /// Computes the wait before retry `retry` with a given jitter.
    ///
    /// Saturates instead of overflowing for large retry numbers.
    pub fn delay_with_jitter(&self, retry: u32, jitter_ms: u64) -> Duration {
        let cap = u64::try_from(self.max_delay.as_millis()).unwrap_or(u64::MAX);
        let exponential = 2u64.saturating_pow(retry);

        Duration::from_millis(exponential.saturating_add(jitter_ms).min(cap))
    }

    /// Computes the wait before retry `retry` with fresh random jitter.
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let jitter = if self.jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..self.jitter_ms)
        };
        self.delay_with_jitter(retry, jitter)
    }
}

impl Default for RetryStrategy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}
