//! Retry Policy
//!
//! Exponential backoff with jitter for idempotent backend requests. Only
//! errors classified as transient are retried.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::domain::RetryConfig;
use crate::error::Result;

/// Backoff schedule for one class of requests
#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub multiplier: f64,
    /// Jitter factor (0.0 - 1.0) to randomize delays
    pub jitter: f64,
    /// Maximum number of retries (0 = never retry)
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            multiplier: config.multiplier,
            jitter: config.jitter,
            max_attempts: config.max_attempts,
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries
    pub fn none() -> Self {
        Self {
            max_attempts: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt` (1-based), or `None` once exhausted
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt > self.max_attempts {
            return None;
        }

        // Calculate delay with exponential backoff
        let base_delay =
            self.initial_delay.as_millis() as f64 * self.multiplier.powi((attempt - 1) as i32);
        let capped_delay = base_delay.min(self.max_delay.as_millis() as f64);

        // Apply jitter
        let jitter_range = capped_delay * self.jitter;
        let jitter = (rand_jitter() * 2.0 - 1.0) * jitter_range;
        let final_delay = (capped_delay + jitter).max(0.0) as u64;

        Some(Duration::from_millis(final_delay))
    }

    /// Run `op` until it succeeds, fails permanently, or retries run out
    pub async fn run<T, Fut, Op>(&self, label: &str, mut op: Op) -> Result<T>
    where
        Op: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() => {
                    attempt += 1;
                    let Some(delay) = self.delay_for(attempt) else {
                        return Err(err);
                    };
                    warn!(
                        "{}: {} (retry {}/{} in {}ms)",
                        label,
                        err,
                        attempt,
                        self.max_attempts,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Simple pseudo-random jitter (0.0 - 1.0)
fn rand_jitter() -> f64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    (nanos % 1000) as f64 / 1000.0
}
