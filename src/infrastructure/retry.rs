//! Bounded exponential backoff shared by the broker publisher and mail sender

use std::time::Duration;

use backon::{BackoffBuilder, ExponentialBuilder};
use serde::Deserialize;

/// Retry policy with exponential backoff
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: usize,
    /// Delay before the first retry
    pub initial_delay_ms: u64,
    /// Upper bound on any single delay
    pub max_delay_ms: u64,
    /// Randomize delays to spread concurrent retries
    #[serde(default = "default_jitter")]
    pub jitter: bool,
}

fn default_jitter() -> bool {
    true
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 100,
            max_delay_ms: 5000,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, initial_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_attempts,
            initial_delay_ms,
            max_delay_ms,
            jitter: true,
        }
    }

    pub fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }

    /// Backoff builder for the retries following the first attempt
    pub fn backoff(&self) -> ExponentialBuilder {
        let builder = ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(self.initial_delay_ms))
            .with_max_delay(Duration::from_millis(self.max_delay_ms))
            .with_max_times(self.max_attempts.saturating_sub(1));

        if self.jitter {
            builder.with_jitter()
        } else {
            builder
        }
    }

    /// Delay to wait before each attempt; the first is always zero
    ///
    /// Yields `max_attempts` items (at least one).
    pub fn delays(&self) -> impl Iterator<Item = Duration> {
        std::iter::once(Duration::ZERO).chain(self.backoff().build())
    }
}
