//! In-process [`ArticleStore`] with the same idempotency contract as Postgres.
//!
//! Used by tests and by the CLI when no database is configured.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use finnews_core::{
    Article, ArticleStore, Cluster, EntityBundle, RunStats, SentimentScore, StoreError,
};

use crate::batching::{upsert_in_batches, UPSERT_BATCH_SIZE};

#[derive(Debug, Clone, PartialEq)]
pub struct MemoryRunRecord {
    pub id: i64,
    pub trigger: String,
    pub stats: Option<RunStats>,
    pub error: Option<String>,
    pub finished: bool,
}

#[derive(Debug, Default)]
struct MemoryState {
    articles: BTreeMap<i64, Article>,
    hashes: HashSet<String>,
    clusters: BTreeMap<i64, Cluster>,
    enrichment: HashMap<i64, (EntityBundle, SentimentScore)>,
    runs: Vec<MemoryRunRecord>,
}

#[derive(Debug, Default)]
pub struct MemoryArticleStore {
    state: Mutex<MemoryState>,
}

impl MemoryArticleStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn article_count(&self) -> usize {
        self.lock().articles.len()
    }

    #[must_use]
    pub fn articles(&self) -> Vec<Article> {
        self.lock().articles.values().cloned().collect()
    }

    #[must_use]
    pub fn clusters(&self) -> Vec<Cluster> {
        self.lock().clusters.values().cloned().collect()
    }

    #[must_use]
    pub fn enrichment(&self, article_id: i64) -> Option<(EntityBundle, SentimentScore)> {
        self.lock().enrichment.get(&article_id).cloned()
    }

    #[must_use]
    pub fn runs(&self) -> Vec<MemoryRunRecord> {
        self.lock().runs.clone()
    }

    fn insert_batch(&self, batch: &[Article]) -> usize {
        let mut state = self.lock();
        let mut inserted = 0;
        for article in batch {
            if state.articles.contains_key(&article.id)
                || state.hashes.contains(&article.content_hash)
            {
                continue;
            }
            state.hashes.insert(article.content_hash.clone());
            state.articles.insert(article.id, article.clone());
            inserted += 1;
        }
        inserted
    }
}

#[async_trait]
impl ArticleStore for MemoryArticleStore {
    async fn existing(&self, ids: &[i64]) -> Result<HashSet<i64>, StoreError> {
        let state = self.lock();
        Ok(ids
            .iter()
            .copied()
            .filter(|id| state.articles.contains_key(id))
            .collect())
    }

    async fn existing_hashes(&self, hashes: &[String]) -> Result<HashSet<String>, StoreError> {
        let state = self.lock();
        Ok(hashes
            .iter()
            .filter(|h| state.hashes.contains(*h))
            .cloned()
            .collect())
    }

    async fn upsert(&self, articles: &[Article]) -> Result<usize, StoreError> {
        upsert_in_batches(articles, UPSERT_BATCH_SIZE, Duration::ZERO, |batch| {
            let inserted = self.insert_batch(batch);
            async move { Ok(inserted) }
        })
        .await
    }

    async fn save_clusters(&self, clusters: &[Cluster]) -> Result<(), StoreError> {
        let mut state = self.lock();
        for cluster in clusters {
            state.clusters.insert(cluster.main_id, cluster.clone());
        }
        Ok(())
    }

    async fn save_enrichment(
        &self,
        article_id: i64,
        entities: &EntityBundle,
        sentiment: &SentimentScore,
    ) -> Result<(), StoreError> {
        self.lock()
            .enrichment
            .insert(article_id, (entities.clone(), *sentiment));
        Ok(())
    }

    async fn start_run(&self, trigger: &str) -> Result<i64, StoreError> {
        let mut state = self.lock();
        let id = i64::try_from(state.runs.len()).unwrap_or(i64::MAX - 1) + 1;
        state.runs.push(MemoryRunRecord {
            id,
            trigger: trigger.to_string(),
            stats: None,
            error: None,
            finished: false,
        });
        Ok(id)
    }

    async fn finish_run(
        &self,
        run_id: i64,
        stats: &RunStats,
        error: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut state = self.lock();
        let run = state
            .runs
            .iter_mut()
            .find(|r| r.id == run_id && !r.finished)
            .ok_or_else(|| StoreError::Backend(format!("pipeline run {run_id} is not running")))?;
        run.stats = Some(stats.clone());
        run.error = error.map(ToOwned::to_owned);
        run.finished = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn article(id: i64, hash: &str) -> Article {
        Article {
            id,
            title: format!("title {id}"),
            text: format!("text {id}"),
            source: "https://example.com/rss".to_string(),
            published_at: Utc::now(),
            content_hash: hash.to_string(),
            ingested_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn upsert_twice_inserts_once_then_zero() {
        let store = MemoryArticleStore::new();
        let batch = vec![article(1, "a"), article(2, "b")];

        assert_eq!(store.upsert(&batch).await.unwrap(), 2);
        assert_eq!(store.upsert(&batch).await.unwrap(), 0);
        assert_eq!(store.article_count(), 2);
    }

    #[tokio::test]
    async fn hash_conflict_with_new_id_is_skipped() {
        let store = MemoryArticleStore::new();
        store.upsert(&[article(1, "same")]).await.unwrap();
        let inserted = store.upsert(&[article(99, "same")]).await.unwrap();
        assert_eq!(inserted, 0);
        assert!(store.existing(&[99]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn existing_reports_only_stored_ids_and_hashes() {
        let store = MemoryArticleStore::new();
        store.upsert(&[article(1, "a"), article(2, "b")]).await.unwrap();

        let ids = store.existing(&[1, 3]).await.unwrap();
        assert_eq!(ids, HashSet::from([1]));

        let hashes = store
            .existing_hashes(&["b".to_string(), "z".to_string()])
            .await
            .unwrap();
        assert_eq!(hashes, HashSet::from(["b".to_string()]));
    }

    #[tokio::test]
    async fn large_batches_are_fully_inserted() {
        let store = MemoryArticleStore::new();
        let batch: Vec<Article> = (0..137).map(|i| article(i, &format!("h{i}"))).collect();
        assert_eq!(store.upsert(&batch).await.unwrap(), 137);
    }

    #[tokio::test]
    async fn finishing_a_run_twice_fails() {
        let store = MemoryArticleStore::new();
        let id = store.start_run("manual").await.unwrap();
        let stats = RunStats::started(0);
        store.finish_run(id, &stats, None).await.unwrap();
        assert!(store.finish_run(id, &stats, None).await.is_err());
        assert!(store.runs()[0].finished);
    }
}
