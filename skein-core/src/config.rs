//! Broker and retry configuration.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a broker instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Number of partitions per topic.
    ///
    /// Fixed for the lifetime of the broker: partition assignments are a
    /// pure function of this value, so changing it invalidates every prior
    /// assignment. There is no live resize; build a new broker instead.
    pub num_partitions: u32,

    /// Retry behaviour for failed deliveries
    pub retry: RetryConfig,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self { num_partitions: 4, retry: RetryConfig::default() }
    }
}

impl BrokerConfig {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the partition count per topic.
    #[must_use]
    pub fn with_num_partitions(mut self, num_partitions: u32) -> Self {
        self.num_partitions = num_partitions;
        self
    }

    /// Set the retry configuration.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] naming the offending parameter.
    pub fn validate(&self) -> Result<()> {
        if self.num_partitions == 0 {
            return Err(Error::configuration("num_partitions", "must be greater than 0"));
        }
        self.retry.validate()
    }
}

/// Bounded-retry and backoff configuration for the delivery path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total delivery attempts per (event, consumer) pair before the event
    /// is dead-lettered. A value of 3 means 2 retries after the first
    /// failure.
    pub max_attempts: u32,

    /// Delay before the first retry
    pub initial_backoff: Duration,

    /// Growth factor applied to the delay after each failed attempt
    pub backoff_multiplier: f64,

    /// Ceiling on the computed delay, bounding worst-case dead-letter latency
    pub max_backoff: Duration,

    /// Jitter fraction in `[0, 1)`; each delay is scaled by a random factor
    /// in `[1 - jitter, 1 + jitter)`
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(25),
            backoff_multiplier: 2.0,
            max_backoff: Duration::from_secs(1),
            jitter: 0.2,
        }
    }
}

impl RetryConfig {
    /// Create a new retry configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the total attempt budget.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the delay before the first retry.
    #[must_use]
    pub fn with_initial_backoff(mut self, initial_backoff: Duration) -> Self {
        self.initial_backoff = initial_backoff;
        self
    }

    /// Set the backoff growth factor.
    #[must_use]
    pub fn with_backoff_multiplier(mut self, backoff_multiplier: f64) -> Self {
        self.backoff_multiplier = backoff_multiplier;
        self
    }

    /// Set the delay ceiling.
    #[must_use]
    pub fn with_max_backoff(mut self, max_backoff: Duration) -> Self {
        self.max_backoff = max_backoff;
        self
    }

    /// Set the jitter fraction.
    #[must_use]
    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter;
        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] naming the offending parameter.
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(Error::configuration("retry.max_attempts", "must be greater than 0"));
        }
        if self.backoff_multiplier < 1.0 {
            return Err(Error::configuration("retry.backoff_multiplier", "must be at least 1.0"));
        }
        if self.initial_backoff > self.max_backoff {
            return Err(Error::configuration(
                "retry.initial_backoff",
                "must not exceed retry.max_backoff",
            ));
        }
        if !(0.0..1.0).contains(&self.jitter) {
            return Err(Error::configuration("retry.jitter", "must be in [0, 1)"));
        }
        Ok(())
    }

    /// Deterministic (un-jittered) delay before the retry following the
    /// given failed attempt, where `attempt` counts attempts made so far
    /// starting at 1. Exponential in the attempt number, capped at
    /// `max_backoff`.
    #[must_use]
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        // Clamp the exponent so the f64 never saturates to infinity.
        let exponent = attempt.saturating_sub(1).min(32);
        let delay =
            self.initial_backoff.as_secs_f64() * self.backoff_multiplier.powi(exponent as i32);
        Duration::from_secs_f64(delay.min(self.max_backoff.as_secs_f64()))
    }
}
