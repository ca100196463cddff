//! Retry policy for provider calls.
//!
//! Only failures that report `is_retryable()` are retried. The delay before
//! retry `k` (1-based) is `base_delay * backoff^(k-1)`, capped at
//! [`MAX_RETRY_DELAY`].

use std::time::Duration;

use screenlab_core::BarSeries;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::provider::{FetchError, InstrumentProvider};

/// Upper bound on any single sleep between attempts.
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first; values below 1 behave as 1.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub backoff: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            backoff: 2.0,
        }
    }
}

impl RetryPolicy {
    /// A single attempt, no retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn new(max_attempts: u32, base_delay: Duration, backoff: f64) -> Self {
        Self {
            max_attempts,
            base_delay,
            backoff,
        }
    }

    /// Sleep before the given retry (1 = first retry).
    pub fn delay_before_retry(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }
        let exponent = i32::try_from(retry - 1).unwrap_or(i32::MAX);
        let secs = self.base_delay.as_secs_f64() * self.backoff.max(1.0).powi(exponent);
        Duration::try_from_secs_f64(secs)
            .map_or(MAX_RETRY_DELAY, |delay| delay.min(MAX_RETRY_DELAY))
    }
}

/// Wraps a provider with a [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct RetryingProvider<P> {
    inner: P,
    policy: RetryPolicy,
    name: String,
}

impl<P: InstrumentProvider> RetryingProvider<P> {
    pub fn new(inner: P, policy: RetryPolicy) -> Self {
        let name = format!("{}+retry", inner.name());
        Self {
            inner,
            policy,
            name,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }
}

impl<P: InstrumentProvider> InstrumentProvider for RetryingProvider<P> {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch(&self, symbol: &str) -> Result<BarSeries, FetchError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.inner.fetch(symbol) {
                Ok(series) => return Ok(series),
                Err(err) if !err.is_retryable() => return Err(err),
                Err(err) if attempt >= max_attempts => {
                    warn!(symbol, attempts = attempt, error = %err, "provider retries exhausted");
                    return Err(FetchError::Exhausted {
                        symbol: symbol.to_string(),
                        attempts: attempt,
                        last: err.to_string(),
                    });
                }
                Err(err) => {
                    let delay = self.policy.delay_before_retry(attempt);
                    warn!(
                        symbol,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "provider call failed, retrying"
                    );
                    std::thread::sleep(delay);
                    attempt += 1;
                }
            }
        }
    }
}
