//! The optional summary stage's call path: rate limit, retry with backoff,
//! safety check, usage accounting. Every failure degrades to "no summary".

use std::sync::Arc;

use finnews_core::{ScoringError, Summarizer};
use finnews_scoring::SafetyGuard;
use tokio::time::Instant;

use crate::error::RateLimitError;
use crate::limiter::RateLimiter;
use crate::retry::{CallError, RetryPolicy};
use crate::usage::UsageTracker;

pub struct GuardedSummarizer {
    inner: Arc<dyn Summarizer>,
    limiter: Arc<RateLimiter>,
    usage: Arc<UsageTracker>,
    retry: RetryPolicy,
    guard: SafetyGuard,
}

impl GuardedSummarizer {
    #[must_use]
    pub fn new(
        inner: Arc<dyn Summarizer>,
        limiter: Arc<RateLimiter>,
        usage: Arc<UsageTracker>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            inner,
            limiter,
            usage,
            retry,
            guard: SafetyGuard::default(),
        }
    }

    /// Reset the per-run call budget.
    pub fn begin_run(&self) {
        self.limiter.begin_run();
    }

    /// Summarize `text`, or `None` when the summarizer is limited, failing, or
    /// produced something the safety guard rejects.
    pub async fn summarize(&self, article_id: i64, text: &str) -> Option<String> {
        match self.retry.run(|| self.attempt(text)).await {
            Ok(summary) => Some(summary),
            Err(e) => {
                tracing::warn!(article_id, error = %e, "summary skipped");
                None
            }
        }
    }

    async fn attempt(&self, text: &str) -> Result<String, CallError<ScoringError>> {
        match self.limiter.try_acquire() {
            Ok(()) => {}
            Err(e @ RateLimitError::WindowFull { .. }) => {
                return Err(CallError::Retryable(ScoringError::RateLimited(e.to_string())));
            }
            Err(e @ RateLimitError::RunBudgetExhausted { .. }) => {
                return Err(CallError::Fatal(ScoringError::RateLimited(e.to_string())));
            }
        }

        let started = Instant::now();
        let summary = match self.inner.summarize(text).await {
            Ok(summary) => summary,
            Err(e) => {
                self.usage.record_failure();
                return Err(if e.is_retryable() {
                    CallError::Retryable(e)
                } else {
                    CallError::Fatal(e)
                });
            }
        };

        match self.guard.check(&summary.text) {
            Ok(clean) => {
                self.usage.record_success(
                    summary.input_tokens,
                    summary.output_tokens,
                    started.elapsed(),
                );
                Ok(clean)
            }
            Err(e) => {
                self.usage.record_failure();
                Err(CallError::Fatal(e))
            }
        }
    }
}
