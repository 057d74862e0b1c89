//! Retry policy for failed batch requests
//!
//! Backoff is linear: the n-th consecutive failure waits `n * base_delay`
//! before the same request is issued again. Reaching the configured number
//! of consecutive failures stops the run.
//!
//! The policy only computes delays. Waiting goes through a [`Sleeper`] so
//! tests can record delays instead of spending them.
//!
//! # Example
//!
//! ```
//! use lotto_archive::retry::{BackoffPolicy, RetryDecision};
//! use std::time::Duration;
//!
//! let policy = BackoffPolicy::new(3, Duration::from_secs(1));
//! assert_eq!(policy.on_failure(1), RetryDecision::RetryAfter(Duration::from_secs(1)));
//! assert_eq!(policy.on_failure(2), RetryDecision::RetryAfter(Duration::from_secs(2)));
//! assert_eq!(policy.on_failure(3), RetryDecision::GiveUp);
//! ```

use crate::config::RetryConfig;
use async_trait::async_trait;
use std::time::Duration;

/// What to do after a failed request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait this long, then repeat the same request
    RetryAfter(Duration),
    /// Stop retrying
    GiveUp,
}

/// Linear backoff with a cap on consecutive failures
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BackoffPolicy {
    max_consecutive_failures: u32,
    base_delay: Duration,
}

impl BackoffPolicy {
    /// Policy giving up at `max_consecutive_failures` with `base_delay` steps
    pub fn new(max_consecutive_failures: u32, base_delay: Duration) -> Self {
        Self {
            max_consecutive_failures,
            base_delay,
        }
    }

    /// Failure count at which the run stops
    pub fn max_consecutive_failures(&self) -> u32 {
        self.max_consecutive_failures
    }

    /// Backoff before retrying after `failures` consecutive failures
    pub fn delay_for(&self, failures: u32) -> Duration {
        self.base_delay.saturating_mul(failures)
    }

    /// Decide what follows the `failures`-th consecutive failure (1-based)
    pub fn on_failure(&self, failures: u32) -> RetryDecision {
        if failures >= self.max_consecutive_failures {
            RetryDecision::GiveUp
        } else {
            RetryDecision::RetryAfter(self.delay_for(failures))
        }
    }
}

impl From<&RetryConfig> for BackoffPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(config.max_consecutive_failures, config.base_delay)
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

/// Source of delays for politeness pauses and backoff
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Suspend the caller for `duration`
    async fn sleep(&self, duration: Duration);
}

/// Sleeper backed by the tokio timer
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}
