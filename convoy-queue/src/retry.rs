//! Bounded retry for freshly provisioned queues and containers.
//!
//! Creating a queue or container does not make it instantly usable: there
//! is a short window during which operations against it still fail. This
//! module retries exactly that window, transient availability errors, with
//! exponential backoff and jitter. Anything else propagates on first
//! failure.

use std::time::Duration;

use rand::Rng;
use serde::Deserialize;
use tracing::debug;

use convoy_cloud::CloudError;

use crate::error::StorageError;

const fn default_max_attempts() -> u32 {
    5
}

const fn default_base_delay_ms() -> u64 {
    50
}

const fn default_max_delay_ms() -> u64 {
    5_000
}

const fn default_jitter_factor() -> f64 {
    0.2
}

/// Retry budget and backoff schedule.
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Maximum attempts, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base backoff delay in milliseconds.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Ceiling on any single backoff delay, in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Jitter factor applied to every delay (e.g. `0.2` for ±20%).
    #[serde(default = "default_jitter_factor")]
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter_factor: default_jitter_factor(),
        }
    }
}

impl RetryConfig {
    /// A budget with no waiting between attempts, for tests.
    #[must_use]
    pub const fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay_ms: 0,
            max_delay_ms: 0,
            jitter_factor: 0.0,
        }
    }
}

/// Executor for the create-then-use race window.
#[derive(Debug, Clone)]
pub struct ProvisioningRetry {
    config: RetryConfig,
}

impl ProvisioningRetry {
    /// Create an executor with the given budget.
    #[must_use]
    pub const fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Backoff before the attempt after `attempt` failures.
    ///
    /// `min(base * 2^(attempt - 1), max) * (1 ± jitter)`, saturating.
    #[must_use]
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let delay_ms = if exponent >= 63 {
            self.config.max_delay_ms
        } else {
            self.config
                .base_delay_ms
                .saturating_mul(1_u64 << exponent)
                .min(self.config.max_delay_ms)
        };

        // Intentional precision loss and casting for randomization
        #[allow(
            clippy::cast_precision_loss,
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss
        )]
        let jittered_ms = {
            let jitter_range = (delay_ms as f64) * self.config.jitter_factor;
            if jitter_range > 0.0 {
                let jitter: f64 = rand::rng().random_range(-jitter_range..=jitter_range);
                ((delay_ms as f64) + jitter).max(0.0) as u64
            } else {
                delay_ms
            }
        };

        Duration::from_millis(jittered_ms)
    }

    /// Run `operation` until it succeeds, fails non-transiently, or the
    /// attempt budget runs out.
    ///
    /// # Errors
    /// Non-transient failures propagate unchanged on the attempt they
    /// occur; budget exhaustion surfaces as
    /// [`StorageError::RetryExhausted`] carrying the last transient error.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T, StorageError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CloudError>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() => {
                    if attempt >= self.config.max_attempts {
                        return Err(StorageError::RetryExhausted { attempts: attempt, last: e });
                    }
                    let delay = self.backoff_delay(attempt);
                    debug!(attempt, ?delay, error = %e, "resource not ready yet, backing off");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}
