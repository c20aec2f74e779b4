use thiserror::Error;

/// Failure fetching or parsing one feed source. Never aborts a whole fetch.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("malformed feed payload from {url}: {reason}")]
    Parse { url: String, reason: String },

    #[error("fetch of {url} timed out after {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },
}
