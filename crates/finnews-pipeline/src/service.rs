//! The control facade the server, scheduler and CLI drive.

use std::sync::Arc;

use finnews_core::{
    load_taxonomy, Alert, AppConfig, Article, ArticleStore, Embedder, EntityClassifier,
    QueryResponse, RunStats, SentimentClassifier, VectorIndex,
};
use finnews_feeds::{FeedFetcher, FetcherConfig};
use finnews_scoring::{
    GeminiSummarizer, KeywordEntityClassifier, LexiconSentiment, MemoryIndex, QdrantIndex,
    TeiEmbedder,
};
use tokio::sync::broadcast;

use crate::alerts::AlertBroadcaster;
use crate::dedup::DedupClusterer;
use crate::enrichment::EnrichmentStage;
use crate::error::{PipelineError, QueryError, ServiceError};
use crate::indexer::Indexer;
use crate::limiter::RateLimiter;
use crate::orchestrator::PipelineOrchestrator;
use crate::query::QueryEngine;
use crate::retry::{RetryPolicy, DEFAULT_BASE_DELAY};
use crate::summarize::GuardedSummarizer;
use crate::usage::{UsageSnapshot, UsageTracker};

pub const MANUAL_TRIGGER: &str = "manual";
pub const SCHEDULER_TRIGGER: &str = "scheduler";

pub struct NewsService {
    fetcher: FeedFetcher,
    sources: Vec<String>,
    orchestrator: PipelineOrchestrator,
    query: QueryEngine,
    limiter: Arc<RateLimiter>,
    usage: Arc<UsageTracker>,
}

impl NewsService {
    #[must_use]
    pub fn new(
        fetcher: FeedFetcher,
        sources: Vec<String>,
        orchestrator: PipelineOrchestrator,
        query: QueryEngine,
        limiter: Arc<RateLimiter>,
        usage: Arc<UsageTracker>,
    ) -> Self {
        Self {
            fetcher,
            sources,
            orchestrator,
            query,
            limiter,
            usage,
        }
    }

    /// Wire the production collaborators from configuration.
    ///
    /// Uses Qdrant when `qdrant_url` is set (creating the collection if
    /// needed) and the in-process index otherwise. The summary stage is only
    /// enabled when a Gemini API key is configured.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] if the taxonomy cannot be loaded, the HTTP
    /// client cannot be built, or the Qdrant collection cannot be prepared.
    pub async fn from_config(
        config: &AppConfig,
        store: Arc<dyn ArticleStore>,
    ) -> Result<Self, ServiceError> {
        let taxonomy = Arc::new(load_taxonomy(&config.taxonomy_path)?);
        let classifier = Arc::new(KeywordEntityClassifier::new(Arc::clone(&taxonomy))?);
        let embedder: Arc<dyn Embedder> = Arc::new(TeiEmbedder::new(&config.tei_url));

        let index: Arc<dyn VectorIndex> = if let Some(url) = &config.qdrant_url {
            let qdrant = QdrantIndex::new(url, &config.qdrant_collection, config.embedding_dim);
            qdrant.ensure_collection().await?;
            Arc::new(qdrant)
        } else {
            tracing::warn!("FINNEWS_QDRANT_URL not set; using in-memory vector index");
            Arc::new(MemoryIndex::new())
        };

        let limiter = Arc::new(RateLimiter::new(
            config.llm_max_calls_per_minute,
            config.llm_max_calls_per_run,
        ));
        let usage = Arc::new(UsageTracker::new());
        let summarizer = config.gemini_api_key.as_deref().map(|key| {
            GuardedSummarizer::new(
                Arc::new(GeminiSummarizer::new(key, &config.gemini_model)),
                Arc::clone(&limiter),
                Arc::clone(&usage),
                RetryPolicy::new(config.llm_max_retries, DEFAULT_BASE_DELAY),
            )
        });
        if summarizer.is_none() {
            tracing::info!("GEMINI_API_KEY not set; summary stage disabled");
        }

        let sentiment: Arc<dyn SentimentClassifier> = Arc::new(LexiconSentiment);
        let entities: Arc<dyn EntityClassifier> = classifier;

        let orchestrator = PipelineOrchestrator::new(
            store,
            DedupClusterer::new(
                Arc::clone(&embedder),
                config.dedup_threshold,
                config.dedup_linkage,
            ),
            EnrichmentStage::new(Arc::clone(&entities), sentiment, taxonomy),
            summarizer,
            Indexer::new(Arc::clone(&embedder), Arc::clone(&index)),
            AlertBroadcaster::new(),
        );
        let query = QueryEngine::new(entities, embedder, index);
        let fetcher = FeedFetcher::new(FetcherConfig::from_app_config(config))?;

        Ok(Self::new(
            fetcher,
            config.feeds.clone(),
            orchestrator,
            query,
            limiter,
            usage,
        ))
    }

    #[must_use]
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    /// Fetch and normalize every configured source, keeping at most `limit`
    /// articles.
    pub async fn fetch(&self, limit: Option<usize>) -> Vec<Article> {
        let mut articles = self.fetcher.fetch(&self.sources).await;
        if let Some(limit) = limit {
            articles.truncate(limit);
        }
        articles
    }

    /// Fetch and run the full pipeline over everything fetched (up to `limit`).
    ///
    /// # Errors
    ///
    /// See [`PipelineOrchestrator::run`].
    pub async fn trigger_pipeline_run(
        &self,
        limit: Option<usize>,
    ) -> Result<RunStats, PipelineError> {
        if self.orchestrator.is_running() {
            return Err(PipelineError::RunInProgress);
        }
        let articles = self.fetch(limit).await;
        self.orchestrator.run(articles, MANUAL_TRIGGER).await
    }

    /// Fetch, keep only articles whose id and content hash were never stored,
    /// and run the pipeline on that subset. The run's `fetched` counter is
    /// everything the feeds returned; `new` counts what was stored.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Store`] if the existence lookups fail, otherwise see
    /// [`PipelineOrchestrator::run`].
    pub async fn ingest_new(&self, trigger: &str) -> Result<RunStats, PipelineError> {
        if self.orchestrator.is_running() {
            return Err(PipelineError::RunInProgress);
        }
        let fetched = self.fetch(None).await;
        let total = fetched.len();
        let fresh = self.filter_unseen(fetched).await?;
        tracing::info!(fetched = total, new = fresh.len(), trigger, "incremental ingest");

        self.orchestrator
            .run_with_fetched(fresh, total, trigger)
            .await
    }

    /// Drop articles whose id or content hash is already stored.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Store`] if either lookup fails.
    pub async fn filter_unseen(
        &self,
        articles: Vec<Article>,
    ) -> Result<Vec<Article>, PipelineError> {
        if articles.is_empty() {
            return Ok(articles);
        }
        let store = self.orchestrator.store();
        let ids: Vec<i64> = articles.iter().map(|a| a.id).collect();
        let hashes: Vec<String> = articles.iter().map(|a| a.content_hash.clone()).collect();
        let known_ids = store.existing(&ids).await?;
        let known_hashes = store.existing_hashes(&hashes).await?;

        Ok(articles
            .into_iter()
            .filter(|a| !known_ids.contains(&a.id) && !known_hashes.contains(&a.content_hash))
            .collect())
    }

    /// Run the pipeline over an explicit batch.
    ///
    /// # Errors
    ///
    /// See [`PipelineOrchestrator::run`].
    pub async fn run_batch(
        &self,
        articles: Vec<Article>,
        trigger: &str,
    ) -> Result<RunStats, PipelineError> {
        self.orchestrator.run(articles, trigger).await
    }

    /// # Errors
    ///
    /// See [`QueryEngine::query`].
    pub async fn query(&self, text: &str, top_k: usize) -> Result<QueryResponse, QueryError> {
        self.query.query(text, top_k).await
    }

    #[must_use]
    pub fn usage_health(&self) -> UsageSnapshot {
        self.usage.snapshot(self.limiter.remaining())
    }

    #[must_use]
    pub fn last_run(&self) -> Option<RunStats> {
        self.orchestrator.last_run()
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.orchestrator.is_running()
    }

    #[must_use]
    pub fn subscribe_alerts(&self) -> broadcast::Receiver<Alert> {
        self.orchestrator.alerts().subscribe()
    }
}
