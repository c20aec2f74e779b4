//! Rolling-window call limiter for expensive external scorers.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

use crate::error::RateLimitError;

const WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug, Default)]
struct LimiterState {
    calls: VecDeque<Instant>,
    run_calls: usize,
}

impl LimiterState {
    /// Drop timestamps strictly older than the window.
    fn evict(&mut self, now: Instant) {
        while let Some(&front) = self.calls.front() {
            if now.duration_since(front) > WINDOW {
                self.calls.pop_front();
            } else {
                break;
            }
        }
    }
}

/// Caps calls per rolling minute and per pipeline run.
#[derive(Debug)]
pub struct RateLimiter {
    max_calls_per_minute: usize,
    max_calls_per_run: usize,
    state: Mutex<LimiterState>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(max_calls_per_minute: usize, max_calls_per_run: usize) -> Self {
        Self {
            max_calls_per_minute,
            max_calls_per_run,
            state: Mutex::new(LimiterState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LimiterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reserve one call slot, or say why not.
    ///
    /// # Errors
    ///
    /// - [`RateLimitError::WindowFull`] when the last 60 seconds already hold
    ///   `max_calls_per_minute` calls.
    /// - [`RateLimitError::RunBudgetExhausted`] when this run has used its budget.
    pub fn try_acquire(&self) -> Result<(), RateLimitError> {
        let now = Instant::now();
        let mut state = self.lock();
        state.evict(now);

        if state.calls.len() >= self.max_calls_per_minute {
            let retry_after = state
                .calls
                .front()
                .map_or(WINDOW, |&oldest| WINDOW.saturating_sub(now.duration_since(oldest)));
            return Err(RateLimitError::WindowFull {
                limit: self.max_calls_per_minute,
                retry_after,
            });
        }
        if state.run_calls >= self.max_calls_per_run {
            return Err(RateLimitError::RunBudgetExhausted {
                limit: self.max_calls_per_run,
            });
        }

        state.calls.push_back(now);
        state.run_calls += 1;
        Ok(())
    }

    /// Reset the per-run budget. Called at the start of every pipeline run.
    pub fn begin_run(&self) {
        self.lock().run_calls = 0;
    }

    /// Calls still available in the current window.
    #[must_use]
    pub fn remaining(&self) -> usize {
        let mut state = self.lock();
        state.evict(Instant::now());
        self.max_calls_per_minute.saturating_sub(state.calls.len())
    }

    #[must_use]
    pub fn run_calls(&self) -> usize {
        self.lock().run_calls
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn call_after_window_fills_is_rejected_until_oldest_ages_out() {
        let limiter = RateLimiter::new(3, 100);
        for _ in 0..3 {
            limiter.try_acquire().unwrap();
            tokio::time::advance(Duration::from_secs(1)).await;
        }

        let err = limiter.try_acquire().unwrap_err();
        assert!(matches!(err, RateLimitError::WindowFull { limit: 3, .. }));

        // oldest call is now 3s old; exactly 60s old is still inside the window
        tokio::time::advance(Duration::from_secs(57)).await;
        assert!(limiter.try_acquire().is_err());

        tokio::time::advance(Duration::from_millis(1)).await;
        limiter.try_acquire().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn retry_after_reports_time_until_oldest_expires() {
        let limiter = RateLimiter::new(1, 10);
        limiter.try_acquire().unwrap();
        tokio::time::advance(Duration::from_secs(20)).await;

        match limiter.try_acquire() {
            Err(RateLimitError::WindowFull { retry_after, .. }) => {
                assert_eq!(retry_after, Duration::from_secs(40));
            }
            other => panic!("expected WindowFull, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn run_budget_is_separate_and_resettable() {
        let limiter = RateLimiter::new(60, 2);
        limiter.try_acquire().unwrap();
        limiter.try_acquire().unwrap();
        assert_eq!(
            limiter.try_acquire(),
            Err(RateLimitError::RunBudgetExhausted { limit: 2 })
        );

        limiter.begin_run();
        limiter.try_acquire().unwrap();
        assert_eq!(limiter.run_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn remaining_counts_down_and_recovers() {
        let limiter = RateLimiter::new(5, 100);
        limiter.try_acquire().unwrap();
        limiter.try_acquire().unwrap();
        assert_eq!(limiter.remaining(), 3);

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(limiter.remaining(), 5);
    }
}
