use std::time::Duration;

use finnews_core::{RunStage, RunStats, ScoringError, StoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("a pipeline run is already in progress")]
    RunInProgress,

    /// A required stage failed. `stats` holds whatever the run had counted
    /// before the failure; work persisted by earlier stages stays.
    #[error("pipeline stage {stage} failed: {message}")]
    StageFailed {
        stage: RunStage,
        message: String,
        stats: Box<RunStats>,
    },

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl PipelineError {
    /// Partial counters for a failed run, if any were collected.
    #[must_use]
    pub fn partial_stats(&self) -> Option<&RunStats> {
        match self {
            Self::StageFailed { stats, .. } => Some(stats),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("query text must not be empty")]
    EmptyQuery,

    #[error("top_k must be between 1 and {max}, got {got}")]
    InvalidTopK { got: usize, max: usize },

    #[error(transparent)]
    Scoring(#[from] ScoringError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RateLimitError {
    #[error("rate limit exceeded: {limit} calls per minute; retry in {retry_after:?}")]
    WindowFull { limit: usize, retry_after: Duration },

    #[error("run budget exhausted: at most {limit} calls per run")]
    RunBudgetExhausted { limit: usize },
}

/// Failure wiring a [`crate::NewsService`] from configuration.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Config(#[from] finnews_core::ConfigError),

    #[error(transparent)]
    Feed(#[from] finnews_feeds::FeedError),

    #[error("vector index setup failed: {0}")]
    Index(#[from] ScoringError),
}
