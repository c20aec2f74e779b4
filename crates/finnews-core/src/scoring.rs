//! Contracts for the external collaborators the pipeline consumes.
//!
//! Scorers (embedding, entity, sentiment, summary) and storage backends sit
//! behind these traits so the pipeline can be driven by HTTP clients in
//! production and by in-memory fakes in tests.

use std::collections::HashSet;

use async_trait::async_trait;

use crate::article::{Article, Cluster};
use crate::enrichment::{EntityBundle, SentimentScore};
use crate::error::{ScoringError, StoreError};
use crate::index::{IndexEntry, SearchHit};
use crate::run::RunStats;

/// Text to fixed-length vector. Identical input must give identical output.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch, returning one vector per input in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ScoringError>;
}

#[async_trait]
pub trait EntityClassifier: Send + Sync {
    async fn classify_entities(&self, text: &str) -> Result<EntityBundle, ScoringError>;
}

#[async_trait]
pub trait SentimentClassifier: Send + Sync {
    async fn classify_sentiment(&self, text: &str) -> Result<SentimentScore, ScoringError>;
}

/// Summarizer output, with token counts when the backend reports them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub text: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, text: &str) -> Result<Summary, ScoringError>;
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or wholesale-replace entries by id. Returns the number written.
    async fn upsert(&self, entries: Vec<IndexEntry>) -> Result<usize, ScoringError>;

    /// Up to `n` nearest entries, closest first. An empty index yields an empty list.
    async fn search(&self, vector: &[f32], n: usize) -> Result<Vec<SearchHit>, ScoringError>;
}

/// Persistent article storage with content-hash idempotency.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Which of `ids` are already stored. One lookup for the whole slice.
    async fn existing(&self, ids: &[i64]) -> Result<HashSet<i64>, StoreError>;

    /// Which of `hashes` are already stored. One lookup for the whole slice.
    async fn existing_hashes(&self, hashes: &[String]) -> Result<HashSet<String>, StoreError>;

    /// Insert articles, skipping any whose `content_hash` (or id) is already
    /// present. Returns how many rows were actually inserted.
    async fn upsert(&self, articles: &[Article]) -> Result<usize, StoreError>;

    async fn save_clusters(&self, clusters: &[Cluster]) -> Result<(), StoreError>;

    async fn save_enrichment(
        &self,
        article_id: i64,
        entities: &EntityBundle,
        sentiment: &SentimentScore,
    ) -> Result<(), StoreError>;

    /// Record the start of a pipeline run and return its id.
    async fn start_run(&self, trigger: &str) -> Result<i64, StoreError>;

    /// Record the outcome of a pipeline run. `error` is `None` on success.
    async fn finish_run(
        &self,
        run_id: i64,
        stats: &RunStats,
        error: Option<&str>,
    ) -> Result<(), StoreError>;
}
