use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use finnews_core::{AppConfig, Article};
use futures::stream::{self, StreamExt};
use reqwest::Client;

use crate::error::FeedError;
use crate::normalize::{normalize_entry, RawEntry};

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_MAX_CONCURRENT: usize = 16;
const DEFAULT_MAX_AGE_HOURS: i64 = 168;

#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
    pub max_concurrent: usize,
    pub max_age_hours: i64,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: format!("finnews/{}", env!("CARGO_PKG_VERSION")),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            max_age_hours: DEFAULT_MAX_AGE_HOURS,
        }
    }
}

impl FetcherConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            timeout_secs: config.fetch_timeout_secs,
            user_agent: config.fetch_user_agent.clone(),
            max_concurrent: config.max_concurrent_feeds,
            max_age_hours: config.max_age_hours,
        }
    }
}

/// Concurrent RSS/Atom fetcher.
///
/// Every source gets its own bounded-timeout request; a source that fails is
/// logged and contributes nothing, so one dead feed never empties a fetch.
pub struct FeedFetcher {
    client: Client,
    config: FetcherConfig,
}

impl FeedFetcher {
    /// # Errors
    ///
    /// Returns [`FeedError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(config: FetcherConfig) -> Result<Self, FeedError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()?;
        Ok(Self { client, config })
    }

    #[must_use]
    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    /// Fetch every source and return the normalized, batch-deduplicated
    /// articles that fall inside the max-age window.
    ///
    /// Output order follows `sources` order, then entry order within a feed.
    pub async fn fetch(&self, sources: &[String]) -> Vec<Article> {
        let fetched_at = Utc::now();

        let requests: Vec<_> = sources
            .iter()
            .cloned()
            .map(|source| async move {
                let result = self.fetch_source(&source, fetched_at).await;
                (source, result)
            })
            .collect();
        let per_source: Vec<(String, Result<Vec<Article>, FeedError>)> = stream::iter(requests)
            .buffered(self.config.max_concurrent.max(1))
            .collect()
            .await;

        let mut articles = Vec::new();
        let mut failed = 0usize;
        for (source, result) in per_source {
            match result {
                Ok(batch) => {
                    tracing::debug!(source = %source, entries = batch.len(), "feed fetched");
                    articles.extend(batch);
                }
                Err(e) => {
                    failed += 1;
                    tracing::warn!(
                        source = %source,
                        error = %e,
                        "feed fetch failed; skipping source"
                    );
                }
            }
        }

        let raw_count = articles.len();
        let articles = dedup_batch(articles);
        let articles = filter_max_age(articles, self.config.max_age_hours, fetched_at);

        tracing::info!(
            sources = sources.len(),
            failed,
            raw = raw_count,
            kept = articles.len(),
            "fetch complete"
        );
        articles
    }

    /// Fetch and normalize a single source.
    ///
    /// # Errors
    ///
    /// - [`FeedError::Timeout`] when the request exceeds the configured timeout.
    /// - [`FeedError::UnexpectedStatus`] for any non-2xx response.
    /// - [`FeedError::Parse`] when the body is not a valid RSS/Atom/JSON feed.
    /// - [`FeedError::Http`] for other transport failures.
    pub async fn fetch_source(
        &self,
        url: &str,
        fetched_at: DateTime<Utc>,
    ) -> Result<Vec<Article>, FeedError> {
        let response = self.client.get(url).send().await.map_err(|e| self.map_http(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let bytes = response.bytes().await.map_err(|e| self.map_http(url, e))?;
        let feed = feed_rs::parser::parse(&bytes[..]).map_err(|e| FeedError::Parse {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let total = feed.entries.len();
        let articles: Vec<Article> = feed
            .entries
            .into_iter()
            .filter_map(|entry| normalize_entry(RawEntry::from(entry), url, fetched_at))
            .collect();

        if articles.len() < total {
            tracing::debug!(
                source = %url,
                skipped = total - articles.len(),
                "entries without a usable title skipped"
            );
        }
        Ok(articles)
    }

    fn map_http(&self, url: &str, err: reqwest::Error) -> FeedError {
        if err.is_timeout() {
            FeedError::Timeout {
                url: url.to_string(),
                timeout_secs: self.config.timeout_secs,
            }
        } else {
            FeedError::Http(err)
        }
    }
}

/// Keep the first article for every id and every content hash.
#[must_use]
pub fn dedup_batch(mut articles: Vec<Article>) -> Vec<Article> {
    let mut seen_ids: HashSet<i64> = HashSet::new();
    let mut seen_hashes: HashSet<String> = HashSet::new();
    articles.retain(|a| {
        if seen_ids.contains(&a.id) || seen_hashes.contains(&a.content_hash) {
            return false;
        }
        seen_ids.insert(a.id);
        seen_hashes.insert(a.content_hash.clone());
        true
    });
    articles
}

/// Drop articles published more than `max_age_hours` before `now`.
#[must_use]
pub fn filter_max_age(
    mut articles: Vec<Article>,
    max_age_hours: i64,
    now: DateTime<Utc>,
) -> Vec<Article> {
    let cutoff = now - chrono::Duration::hours(max_age_hours);
    articles.retain(|a| a.published_at >= cutoff);
    articles
}
