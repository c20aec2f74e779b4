//! Bounded exponential-backoff retry driven by explicit result tags.

use std::future::Future;
use std::time::Duration;

pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Outcome of one attempt: worth retrying, or final.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallError<E> {
    Retryable(E),
    Fatal(E),
}

impl<E> CallError<E> {
    #[must_use]
    pub fn into_inner(self) -> E {
        match self {
            Self::Retryable(e) | Self::Fatal(e) => e,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Delay before retry number `retry` (0-based): `base * 2^retry`.
    #[must_use]
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.base_delay.saturating_mul(1u32 << retry.min(31))
    }

    /// Run `operation` until it succeeds, fails fatally, or uses up
    /// `max_retries` retries. At most `max_retries + 1` attempts are made.
    ///
    /// # Errors
    ///
    /// Returns the fatal error, or the last retryable error once retries are
    /// exhausted.
    pub async fn run<T, E, F, Fut>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CallError<E>>>,
        E: std::fmt::Display,
    {
        let mut retry = 0u32;
        loop {
            let err = match operation().await {
                Ok(value) => return Ok(value),
                Err(CallError::Fatal(e)) => return Err(e),
                Err(CallError::Retryable(e)) => e,
            };
            if retry >= self.max_retries {
                return Err(err);
            }

            let delay = self.delay_for(retry);
            tracing::warn!(
                retry = retry + 1,
                max_retries = self.max_retries,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %err,
                "retryable call failed; backing off"
            );
            tokio::time::sleep(delay).await;
            retry += 1;
        }
    }
}
