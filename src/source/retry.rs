//! Retry policy for rate-limited requests.

use async_trait::async_trait;
use std::time::Duration;

/// Linear backoff: attempt `n` is followed by a pause of `n * base_backoff`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one.
    pub max_retries: usize,
    pub base_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_backoff: Duration::from_millis(600),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: usize, base_backoff_ms: u64) -> Self {
        Self {
            max_retries,
            base_backoff: Duration::from_millis(base_backoff_ms),
        }
    }

    pub fn max_attempts(&self) -> usize {
        self.max_retries + 1
    }

    /// Pause to take after failed attempt number `attempt` (1-based).
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        self.base_backoff.saturating_mul(attempt as u32)
    }
}

/// Suspends the current task; injected so backoff can be observed in tests.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeper backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
