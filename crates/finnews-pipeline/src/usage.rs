//! Running totals for rate-limited scorer calls and the health signal derived
//! from them.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;

/// Failure rate at or above which the scorer is reported as degraded.
pub const DEGRADED_FAILURE_RATE: f64 = 0.10;
/// Remaining window capacity below which the scorer is reported as capped.
pub const CAPPED_REMAINING_FLOOR: usize = 10;
const COST_PER_MILLION_TOKENS_USD: f64 = 0.20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Capped,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageSnapshot {
    pub status: HealthStatus,
    pub total_calls: u64,
    pub total_failures: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    pub failure_rate: f64,
    pub avg_latency_ms: f64,
    pub estimated_cost_usd: f64,
    pub remaining_calls: usize,
}

#[derive(Debug, Default)]
struct Totals {
    calls: u64,
    failures: u64,
    input_tokens: u64,
    output_tokens: u64,
    latency: Duration,
}

#[derive(Debug, Default)]
pub struct UsageTracker {
    totals: Mutex<Totals>,
}

impl UsageTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Totals> {
        self.totals.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record_success(&self, input_tokens: u64, output_tokens: u64, latency: Duration) {
        let mut t = self.lock();
        t.calls += 1;
        t.input_tokens += input_tokens;
        t.output_tokens += output_tokens;
        t.latency += latency;
    }

    pub fn record_failure(&self) {
        self.lock().failures += 1;
    }

    /// Current totals plus the health status for `remaining_calls` of window capacity.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn snapshot(&self, remaining_calls: usize) -> UsageSnapshot {
        let t = self.lock();
        let attempts = t.calls + t.failures;
        let failure_rate = if attempts == 0 {
            0.0
        } else {
            round_to(t.failures as f64 / attempts as f64, 4)
        };
        let avg_latency_ms = if t.calls == 0 {
            0.0
        } else {
            round_to(t.latency.as_secs_f64() * 1000.0 / t.calls as f64, 2)
        };
        let total_tokens = t.input_tokens + t.output_tokens;
        let estimated_cost_usd =
            round_to(total_tokens as f64 / 1_000_000.0 * COST_PER_MILLION_TOKENS_USD, 6);

        UsageSnapshot {
            status: health_status(failure_rate, remaining_calls),
            total_calls: t.calls,
            total_failures: t.failures,
            input_tokens: t.input_tokens,
            output_tokens: t.output_tokens,
            total_tokens,
            failure_rate,
            avg_latency_ms,
            estimated_cost_usd,
            remaining_calls,
        }
    }
}

#[must_use]
pub fn health_status(failure_rate: f64, remaining_calls: usize) -> HealthStatus {
    if failure_rate >= DEGRADED_FAILURE_RATE {
        HealthStatus::Degraded
    } else if remaining_calls < CAPPED_REMAINING_FLOOR {
        HealthStatus::Capped
    } else {
        HealthStatus::Healthy
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_tracker_is_healthy_with_zeroed_totals() {
        let snap = UsageTracker::new().snapshot(60);
        assert_eq!(snap.status, HealthStatus::Healthy);
        assert_eq!(snap.total_calls, 0);
        assert_eq!(snap.failure_rate, 0.0);
        assert_eq!(snap.avg_latency_ms, 0.0);
    }

    #[test]
    fn averages_latency_over_successful_calls() {
        let tracker = UsageTracker::new();
        tracker.record_success(100, 20, Duration::from_millis(200));
        tracker.record_success(300, 80, Duration::from_millis(400));
        let snap = tracker.snapshot(58);

        assert_eq!(snap.total_calls, 2);
        assert_eq!(snap.total_tokens, 500);
        assert_eq!(snap.avg_latency_ms, 300.0);
        assert_eq!(snap.estimated_cost_usd, 0.0001);
    }

    #[test]
    fn failure_rate_counts_failures_against_all_attempts() {
        let tracker = UsageTracker::new();
        for _ in 0..9 {
            tracker.record_success(0, 0, Duration::ZERO);
        }
        tracker.record_failure();
        let snap = tracker.snapshot(50);
        assert_eq!(snap.failure_rate, 0.1);
        assert_eq!(snap.status, HealthStatus::Degraded);
    }

    #[test]
    fn degraded_outranks_capped() {
        assert_eq!(health_status(0.5, 0), HealthStatus::Degraded);
        assert_eq!(health_status(0.0, 9), HealthStatus::Capped);
        assert_eq!(health_status(0.09, 10), HealthStatus::Healthy);
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&HealthStatus::Capped).unwrap();
        assert_eq!(json, "\"capped\"");
    }
}
