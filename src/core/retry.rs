//! Bounded exponential-backoff retries
//!
//! Wraps a fallible async operation and re-attempts it for a configured set
//! of error kinds. The inter-attempt delay uses `tokio::time::sleep`, so a
//! waiting call path suspends cooperatively instead of parking a worker
//! thread.

use crate::utils::error::Result;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{error, warn};

fn default_max_attempts() -> u32 {
    4
}

fn default_initial_delay_ms() -> u64 {
    1000
}

fn default_backoff_factor() -> f64 {
    2.0
}

fn default_max_delay_ms() -> u64 {
    60_000
}

fn default_retryable_errors() -> Vec<String> {
    // circuit_open is deliberately absent: retrying into an open breaker
    // burns attempts against a dependency that is known to be down
    vec![
        "network_error".to_string(),
        "timeout_error".to_string(),
        "upstream_error".to_string(),
    ]
}

/// Retry configuration. Constructed once at startup and shared read-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, the first call included
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the first retry (milliseconds)
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    /// Multiplier applied to the delay after each retry
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
    /// Cap on the inter-attempt delay (milliseconds)
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Add random jitter to each delay
    #[serde(default)]
    pub jitter: bool,
    /// Error kinds that consume the retry budget; anything else propagates
    /// immediately
    #[serde(default = "default_retryable_errors")]
    pub retryable_errors: Vec<String>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            backoff_factor: default_backoff_factor(),
            max_delay_ms: default_max_delay_ms(),
            jitter: false,
            retryable_errors: default_retryable_errors(),
        }
    }
}

impl RetryPolicy {
    fn is_retryable(&self, kind: &str) -> bool {
        self.retryable_errors.iter().any(|k| k == kind)
    }
}

/// Applies a [`RetryPolicy`] to async operations
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `op` up to `max_attempts` times.
    ///
    /// Only retryable error kinds trigger another attempt; the last observed
    /// error propagates unchanged once the budget is exhausted. Dropping the
    /// returned future cancels any pending delay and stops further attempts.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut delay = Duration::from_millis(self.policy.initial_delay_ms);

        for attempt in 1..=max_attempts {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if !self.policy.is_retryable(err.kind()) {
                        return Err(err);
                    }
                    if attempt == max_attempts {
                        error!(
                            "{} failed after {} attempts: {}",
                            label, max_attempts, err
                        );
                        return Err(err);
                    }

                    warn!(
                        "{} failed (attempt {}/{}): {}. Retrying in {:?}...",
                        label, attempt, max_attempts, err, delay
                    );

                    tokio::time::sleep(self.jittered(delay)).await;

                    delay = Duration::from_millis(
                        ((delay.as_millis() as f64) * self.policy.backoff_factor)
                            .min(self.policy.max_delay_ms as f64) as u64,
                    );
                }
            }
        }

        unreachable!("loop returns on the final attempt")
    }

    fn jittered(&self, delay: Duration) -> Duration {
        if !self.policy.jitter {
            return delay;
        }
        // 0.5x..1.5x of the nominal delay
        let factor = 0.5 + rand::random::<f64>();
        Duration::from_millis(((delay.as_millis() as f64) * factor) as u64)
    }
}
