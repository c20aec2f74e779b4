//! In-process `NewsService` for handler and scheduler tests: no network,
//! no database, deterministic embeddings.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use finnews_core::taxonomy::parse_taxonomy;
use finnews_core::{
    Article, ArticleStore, DedupLinkage, Embedder, EntityClassifier, ScoringError, VectorIndex,
};
use finnews_db::MemoryArticleStore;
use finnews_feeds::{FeedFetcher, FetcherConfig};
use finnews_pipeline::{
    AlertBroadcaster, DedupClusterer, EnrichmentStage, Indexer, NewsService,
    PipelineOrchestrator, QueryEngine, RateLimiter, UsageTracker,
};
use finnews_scoring::{KeywordEntityClassifier, LexiconSentiment, MemoryIndex};

const TAXONOMY: &str = r"
sectors:
  - name: Banking
    keywords: [bank, lender]
companies:
  - name: HDFC Bank
    sector: Banking
    symbol: HDFCBANK.NS
regulators:
  - name: RBI
    aliases: [reserve bank]
";

/// Embeds by first letter so distinct headlines never merge.
struct InitialEmbedder;

#[async_trait]
impl Embedder for InitialEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ScoringError> {
        Ok(texts
            .iter()
            .map(|t| match t.chars().next() {
                Some('H') => vec![1.0, 0.0, 0.0],
                Some('R') => vec![0.0, 1.0, 0.0],
                _ => vec![0.0, 0.0, 1.0],
            })
            .collect())
    }
}

/// A service whose `sources` point at `source_count` unreachable feeds.
pub(crate) fn test_service(source_count: usize) -> Arc<NewsService> {
    let taxonomy = Arc::new(parse_taxonomy(TAXONOMY).unwrap());
    let classifier: Arc<dyn EntityClassifier> =
        Arc::new(KeywordEntityClassifier::new(Arc::clone(&taxonomy)).unwrap());
    let embedder: Arc<dyn Embedder> = Arc::new(InitialEmbedder);
    let index: Arc<dyn VectorIndex> = Arc::new(MemoryIndex::new());
    let store: Arc<dyn ArticleStore> = Arc::new(MemoryArticleStore::new());

    let orchestrator = PipelineOrchestrator::new(
        store,
        DedupClusterer::new(Arc::clone(&embedder), 0.80, DedupLinkage::Seed),
        EnrichmentStage::new(
            Arc::clone(&classifier),
            Arc::new(LexiconSentiment),
            taxonomy,
        ),
        None,
        Indexer::new(Arc::clone(&embedder), Arc::clone(&index)),
        AlertBroadcaster::new(),
    );
    let fetcher = FeedFetcher::new(FetcherConfig {
        timeout_secs: 1,
        ..FetcherConfig::default()
    })
    .unwrap();
    let sources = (0..source_count)
        .map(|i| format!("http://127.0.0.1:9/feed-{i}.xml"))
        .collect();

    Arc::new(NewsService::new(
        fetcher,
        sources,
        orchestrator,
        QueryEngine::new(classifier, embedder, index),
        Arc::new(RateLimiter::new(60, 5)),
        Arc::new(UsageTracker::new()),
    ))
}

pub(crate) fn article(id: i64, title: &str) -> Article {
    Article {
        id,
        title: title.to_string(),
        text: title.to_string(),
        source: "https://news.example/rss".to_string(),
        published_at: Utc::now(),
        content_hash: format!("hash-{id}"),
        ingested_at: Utc::now(),
    }
}
