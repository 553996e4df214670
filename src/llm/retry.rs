//! Timeout and exponential-backoff retry shared by every backend.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::llm::error::LLMError;

/// Retry budget and per-attempt timeout for one backend.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Base delay, doubled each attempt
    pub base_delay: Duration,
    /// Upper bound of the random jitter added to each delay
    pub jitter: Duration,
    /// Wall-clock limit for a single attempt
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            jitter: Duration::from_millis(100),
            timeout: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// A policy that never sleeps between attempts.
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::ZERO,
            jitter: Duration::ZERO,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// `base * 2^attempt + random(0..jitter)`
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = self
            .base_delay
            .saturating_mul(1u32.checked_shl(attempt).unwrap_or(u32::MAX));
        let jitter_ms = self.jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..jitter_ms)
        };
        exp + Duration::from_millis(jitter)
    }

    /// Runs `op` until it succeeds, a non-retryable error occurs, or the budget is spent.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, LLMError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, LLMError>>,
    {
        let mut attempt = 0;
        loop {
            let result = match tokio::time::timeout(self.timeout, op()).await {
                Ok(result) => result,
                Err(_) => Err(LLMError::Timeout(self.timeout)),
            };

            let err = match result {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            let last = attempt >= self.max_retries || !err.is_retryable();
            log::warn!(
                "[{}] Attempt {} failed{}: {}",
                label,
                attempt + 1,
                if last { " (giving up)" } else { "" },
                err
            );
            if last {
                return Err(err);
            }

            tokio::time::sleep(self.backoff(attempt)).await;
            attempt += 1;
        }
    }
}
