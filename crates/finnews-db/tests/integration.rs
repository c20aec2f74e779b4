//! Offline tests for finnews-db pool configuration, row types and the
//! in-memory store. These tests do not require a live database connection.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use chrono::{Duration, Utc};
use finnews_core::{
    AppConfig, Article, ArticleStore, Cluster, DedupLinkage, EntityBundle, Environment, RunStage,
    RunStats, SentimentLabel, SentimentScore,
};
use finnews_db::{MemoryArticleStore, PipelineRunRow, PoolConfig};

fn app_config() -> AppConfig {
    AppConfig {
        database_url: "postgres://example".to_string(),
        env: Environment::Test,
        bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8000),
        log_level: "info".to_string(),
        taxonomy_path: PathBuf::from("./config/taxonomy.yaml"),
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        feeds: vec!["https://example.com/rss".to_string()],
        fetch_timeout_secs: 10,
        fetch_user_agent: "ua".to_string(),
        max_concurrent_feeds: 4,
        max_age_hours: 168,
        dedup_threshold: 0.8,
        dedup_linkage: DedupLinkage::Seed,
        tei_url: "http://localhost:8080".to_string(),
        qdrant_url: None,
        qdrant_collection: "financial_news".to_string(),
        embedding_dim: 384,
        gemini_api_key: None,
        gemini_model: "gemini-2.5-flash".to_string(),
        llm_max_calls_per_minute: 60,
        llm_max_calls_per_run: 5,
        llm_max_retries: 3,
        ingest_interval_secs: 60,
        auto_start_scheduler: false,
    }
}

fn article(id: i64, title: &str) -> Article {
    let now = Utc::now();
    Article {
        id,
        title: title.to_string(),
        text: format!("{title}. body"),
        source: "https://example.com/rss".to_string(),
        published_at: now - Duration::hours(1),
        content_hash: format!("hash-{id}"),
        ingested_at: now,
    }
}

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let pool_config = PoolConfig::from_app_config(&app_config());
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

/// Compile-time smoke test for [`PipelineRunRow`]'s shape.
#[test]
fn pipeline_run_row_has_expected_fields() {
    let row = PipelineRunRow {
        id: 1,
        trigger_source: "scheduler".to_string(),
        status: "running".to_string(),
        fetched: 0,
        new_articles: 0,
        unique_articles: 0,
        clusters: 0,
        indexed: 0,
        alerts_sent: 0,
        last_stage: None,
        error_message: None,
        started_at: Utc::now(),
        completed_at: None,
    };
    assert_eq!(row.status, "running");
    assert!(row.completed_at.is_none());
}

#[tokio::test]
async fn clusters_are_replaced_by_main_id() {
    let store = MemoryArticleStore::new();
    store
        .save_clusters(&[Cluster {
            main_id: 1,
            merged_ids: vec![2],
        }])
        .await
        .unwrap();
    store
        .save_clusters(&[Cluster {
            main_id: 1,
            merged_ids: vec![2, 3],
        }])
        .await
        .unwrap();

    let clusters = store.clusters();
    assert_eq!(clusters.len(), 1);
    assert_eq!(clusters[0].merged_ids, vec![2, 3]);
}

#[tokio::test]
async fn enrichment_is_stored_per_article() {
    let store = MemoryArticleStore::new();
    let entities = EntityBundle {
        regulators: vec!["RBI".to_string()],
        ..EntityBundle::default()
    };
    let sentiment = SentimentScore::new(SentimentLabel::Negative, 0.7);

    store.save_enrichment(5, &entities, &sentiment).await.unwrap();

    let (saved_entities, saved_sentiment) = store.enrichment(5).unwrap();
    assert_eq!(saved_entities.regulators, vec!["RBI".to_string()]);
    assert_eq!(saved_sentiment.label, SentimentLabel::Negative);
}

#[tokio::test]
async fn run_records_keep_stats_and_errors() {
    let store = MemoryArticleStore::new();
    let ok = store.start_run("manual").await.unwrap();
    let failed = store.start_run("scheduler").await.unwrap();
    assert_ne!(ok, failed);

    let mut stats = RunStats::started(10);
    stats.last_stage = Some(RunStage::Done);
    store.finish_run(ok, &stats, None).await.unwrap();

    let mut partial = RunStats::started(4);
    partial.last_stage = Some(RunStage::Deduped);
    store
        .finish_run(failed, &partial, Some("entity stage failed"))
        .await
        .unwrap();

    let runs = store.runs();
    assert_eq!(runs[0].stats.as_ref().unwrap().last_stage, Some(RunStage::Done));
    assert!(runs[0].error.is_none());
    assert_eq!(runs[1].error.as_deref(), Some("entity stage failed"));
}
