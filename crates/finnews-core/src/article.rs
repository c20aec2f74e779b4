use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A normalized news article.
///
/// `id` is derived from source, guid and publish time, so re-fetching the same
/// entry yields the same id. `content_hash` fingerprints the normalized title
/// and is the storage-level dedup key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub title: String,
    pub text: String,
    pub source: String,
    pub published_at: DateTime<Utc>,
    pub content_hash: String,
    pub ingested_at: DateTime<Utc>,
}

/// A group of articles judged to report the same event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    /// Representative article: the lowest-indexed member in run order.
    pub main_id: i64,
    /// All members, `main_id` included, in run order.
    pub merged_ids: Vec<i64>,
}

impl Cluster {
    #[must_use]
    pub fn len(&self) -> usize {
        self.merged_ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.merged_ids.is_empty()
    }
}
