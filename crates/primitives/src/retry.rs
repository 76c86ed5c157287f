//! Retry policy for optimistic-concurrency loops
//!
//! Exponential backoff with full jitter: the delay before attempt `n + 1`
//! is drawn uniformly from `[0, min(max_delay, base_delay * 2^(n-1))]`.

use rand::Rng;
use std::time::Duration;

/// Bounds and pacing for a conflict-retry loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts allowed, including the first; `None` retries forever
    pub max_attempts: Option<u32>,
    /// Backoff ceiling for the first retry
    pub base_delay: Duration,
    /// Upper bound on any single backoff
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Default attempt budget
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 100;

    /// Bounded policy with default pacing
    pub fn bounded(max_attempts: u32) -> Self {
        Self {
            max_attempts: Some(max_attempts.max(1)),
            ..Self::default()
        }
    }

    /// Retry until the write wins
    pub fn unbounded() -> Self {
        Self {
            max_attempts: None,
            ..Self::default()
        }
    }

    /// Retry immediately, with no sleep between attempts
    pub fn immediate(mut self) -> Self {
        self.base_delay = Duration::ZERO;
        self.max_delay = Duration::ZERO;
        self
    }

    /// Whether another attempt may follow `attempts` failed ones
    pub fn allows(&self, attempts: u32) -> bool {
        self.max_attempts.map_or(true, |max| attempts < max)
    }

    /// Backoff ceiling after `attempt` failures (1-based)
    pub fn ceiling(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(31);
        self.base_delay
            .checked_mul(1u32 << shift)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Jittered delay after `attempt` failures (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let ceiling = self.ceiling(attempt);
        if ceiling.is_zero() {
            return ceiling;
        }
        let micros = ceiling.as_micros().min(u64::MAX as u128) as u64;
        Duration::from_micros(rand::thread_rng().gen_range(0..=micros))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: Some(Self::DEFAULT_MAX_ATTEMPTS),
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(100),
        }
    }
}
