//! Retry policy with exponential backoff for HTTP requests
//!
//! Only responses whose status is in the retryable set are retried. Delays
//! grow as `base_delay * multiplier^attempt_index` without jitter, so the
//! defaults wait 100ms, 200ms, 400ms, ... between attempts.

use std::time::Duration;
use backoff::{ExponentialBackoff, backoff::Backoff};
use serde::{Deserialize, Serialize};
use crate::Result;

/// Retry policy configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of attempts, the first one included
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub base_delay: Duration,
    /// Multiplier applied to the delay after every attempt
    pub multiplier: f64,
    /// Upper bound for a single delay
    pub max_delay: Duration,
    /// Statuses that trigger another attempt
    pub retryable_statuses: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            base_delay: Duration::from_millis(100),
            multiplier: 2.0,
            max_delay: Duration::from_secs(60),
            retryable_statuses: vec![429, 502],
        }
    }
}

impl RetryPolicy {
    /// Create a new retry policy with custom attempt cap
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
    }

    /// Set the base delay
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Set the maximum delay
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set the backoff multiplier
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Replace the retryable status set
    pub fn with_retryable_statuses(mut self, statuses: impl IntoIterator<Item = u16>) -> Self {
        self.retryable_statuses = statuses.into_iter().collect();
        self
    }

    /// Whether a response status triggers another attempt
    pub fn is_retryable(&self, status: u16) -> bool {
        self.retryable_statuses.contains(&status)
    }

    /// Delay to wait after attempt `attempt_index` (zero based)
    pub fn delay_for(&self, attempt_index: u32) -> Duration {
        let factor = self.multiplier.powi(attempt_index.min(i32::MAX as u32) as i32);
        let millis = self.base_delay.as_secs_f64() * 1000.0 * factor;
        let capped = millis.min(self.max_delay.as_secs_f64() * 1000.0);
        Duration::from_millis(capped.round() as u64)
    }

    /// Create an exponential backoff instance matching this policy
    pub fn create_backoff(&self) -> ExponentialBackoff {
        let mut backoff = ExponentialBackoff {
            initial_interval: self.base_delay,
            max_interval: self.max_delay,
            multiplier: self.multiplier,
            randomization_factor: 0.0,
            max_elapsed_time: None, // We handle max attempts separately
            ..Default::default()
        };

        backoff.reset();
        backoff
    }

    /// Validate the policy
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(crate::Error::Configuration {
                message: "Retry policy needs at least one attempt".to_string(),
            });
        }

        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(crate::Error::Configuration {
                message: format!("Backoff multiplier must be >= 1.0, got {}", self.multiplier),
            });
        }

        if self.max_delay < self.base_delay {
            return Err(crate::Error::Configuration {
                message: "Maximum delay should be >= base delay".to_string(),
            });
        }

        if let Some(status) = self.retryable_statuses.iter().find(|s| !(100..=599).contains(*s)) {
            return Err(crate::Error::Configuration {
                message: format!("Invalid retryable status: {}", status),
            });
        }

        Ok(())
    }
}

/// Decision on whether to retry a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry the request after the specified delay
    Retry { delay: Duration },
    /// The status is not retryable
    NoRetry,
    /// The status is retryable but no attempts are left
    Exhausted,
}

/// Tracks the attempts of a single call
#[derive(Debug)]
pub struct RetryHandler {
    policy: RetryPolicy,
    attempts: u32,
    backoff: ExponentialBackoff,
}

impl RetryHandler {
    /// Create a new retry handler with the given policy
    pub fn new(policy: RetryPolicy) -> Self {
        let backoff = policy.create_backoff();
        Self {
            policy,
            attempts: 0,
            backoff,
        }
    }

    /// Record that an attempt is about to be made
    pub fn record_attempt(&mut self) {
        self.attempts += 1;
    }

    /// Whether another attempt is allowed
    pub fn can_attempt(&self) -> bool {
        self.attempts < self.policy.max_attempts
    }

    /// Decide what to do after an attempt answered with `status`
    pub fn should_retry(&mut self, status: u16) -> RetryDecision {
        if !self.policy.is_retryable(status) {
            return RetryDecision::NoRetry;
        }

        if !self.can_attempt() {
            log::error!(
                "Request failed with status {} after {} attempts, not retrying",
                status,
                self.attempts
            );
            return RetryDecision::Exhausted;
        }

        let delay = self
            .backoff
            .next_backoff()
            .unwrap_or(self.policy.max_delay);

        log::warn!(
            "Request answered with status {} (attempt {}), retrying after {:?}",
            status,
            self.attempts,
            delay
        );

        RetryDecision::Retry { delay }
    }

    /// Reset the retry handler for a new call
    pub fn reset(&mut self) {
        self.attempts = 0;
        self.backoff.reset();
    }

    /// Get the number of attempts made so far
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}
