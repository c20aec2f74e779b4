use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read taxonomy file {path}: {source}")]
    TaxonomyFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse taxonomy file: {0}")]
    TaxonomyFileParse(#[from] serde_yaml::Error),

    #[error("taxonomy validation failed: {0}")]
    Validation(String),
}

/// Failure reported by an external scoring collaborator (embedder, classifier,
/// summarizer, vector index).
#[derive(Debug, Error)]
pub enum ScoringError {
    /// The collaborator asked us to slow down (HTTP 429 or a local limiter).
    #[error("scorer rate limited: {0}")]
    RateLimited(String),

    /// Transport failure or 5xx; worth retrying.
    #[error("scorer unavailable: {0}")]
    Unavailable(String),

    /// The collaborator answered, but the answer is unusable.
    #[error("scorer returned an invalid response: {0}")]
    InvalidResponse(String),

    #[error("scorer rejected input: {0}")]
    Rejected(String),
}

impl ScoringError {
    /// Whether a retry after back-off has a chance of succeeding.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited(_) | Self::Unavailable(_))
    }
}

/// Failure reported by an [`crate::ArticleStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend is overloaded ("too many requests"/connections); one retry is allowed.
    #[error("store temporarily unavailable: {0}")]
    Transient(String),

    #[error("store error: {0}")]
    Backend(String),
}

impl StoreError {
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}
