//! Command handlers. Each builds only the collaborators its command needs.

use std::sync::Arc;

use anyhow::Context;
use finnews_core::{AppConfig, Article, ArticleStore, QueryResponse};
use finnews_db::{MemoryArticleStore, PgArticleStore, PoolConfig};
use finnews_feeds::{FeedFetcher, FetcherConfig};
use finnews_pipeline::NewsService;

const TITLE_WIDTH: usize = 70;

async fn connect(config: &AppConfig) -> anyhow::Result<sqlx::PgPool> {
    finnews_db::connect_pool(&config.database_url, PoolConfig::from_app_config(config))
        .await
        .context("connecting to database")
}

async fn article_store(
    config: &AppConfig,
    in_memory: bool,
) -> anyhow::Result<Arc<dyn ArticleStore>> {
    if in_memory {
        tracing::info!("using in-memory article store");
        return Ok(Arc::new(MemoryArticleStore::new()));
    }
    let pool = connect(config).await?;
    Ok(Arc::new(PgArticleStore::new(pool)))
}

/// Truncate to `width` characters, marking the cut with `...`.
pub(crate) fn clip(text: &str, width: usize) -> String {
    if text.chars().count() > width {
        format!("{}...", text.chars().take(width).collect::<String>())
    } else {
        text.to_string()
    }
}

fn print_articles(articles: &[Article]) {
    println!("{:<21}{:<18}TITLE", "ID", "PUBLISHED");
    for article in articles {
        println!(
            "{:<21}{:<18}{}",
            article.id,
            article.published_at.format("%Y-%m-%d %H:%M"),
            clip(&article.title, TITLE_WIDTH)
        );
    }
    println!("{} article(s)", articles.len());
}

fn print_query_response(response: &QueryResponse) {
    let intent = &response.matched_entities;
    if !intent.is_empty() {
        println!(
            "matched: companies={:?} sectors={:?} regulators={:?}",
            intent.companies, intent.sectors, intent.regulators
        );
    }
    if response.results.is_empty() {
        println!("no results for \"{}\"", response.query);
        return;
    }
    println!("{:<7}{:<21}TEXT", "SCORE", "ID");
    for result in &response.results {
        println!(
            "{:<7.3}{:<21}{}",
            result.score,
            result.id,
            clip(&result.text, TITLE_WIDTH)
        );
    }
}

/// Fetch all configured feeds and print what normalization kept.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be built.
pub(crate) async fn run_fetch(config: &AppConfig, limit: Option<usize>) -> anyhow::Result<()> {
    let fetcher = FeedFetcher::new(FetcherConfig::from_app_config(config))?;
    let mut articles = fetcher.fetch(&config.feeds).await;
    if let Some(limit) = limit {
        articles.truncate(limit);
    }
    print_articles(&articles);
    Ok(())
}

/// Execute one manual pipeline run and print its counters as JSON.
///
/// # Errors
///
/// Returns an error if the service cannot be wired or the run fails. A
/// failed run still prints the counters it reached.
pub(crate) async fn run_pipeline(
    config: &AppConfig,
    in_memory: bool,
    limit: Option<usize>,
) -> anyhow::Result<()> {
    let store = article_store(config, in_memory).await?;
    let service = NewsService::from_config(config, store).await?;

    match service.trigger_pipeline_run(limit).await {
        Ok(stats) => {
            println!("{}", serde_json::to_string_pretty(&stats)?);
            Ok(())
        }
        Err(e) => {
            if let Some(stats) = e.partial_stats() {
                println!("{}", serde_json::to_string_pretty(stats)?);
            }
            Err(e.into())
        }
    }
}

/// Run a ranked search against the configured vector index.
///
/// # Errors
///
/// Returns an error for invalid input or when the embedder or index fails.
pub(crate) async fn run_query(
    config: &AppConfig,
    text: &str,
    top_k: usize,
) -> anyhow::Result<()> {
    if config.qdrant_url.is_none() {
        tracing::warn!("FINNEWS_QDRANT_URL not set; querying an empty in-memory index");
    }
    // queries never touch the article store
    let service = NewsService::from_config(config, Arc::new(MemoryArticleStore::new())).await?;
    let response = service.query(text, top_k).await?;
    print_query_response(&response);
    Ok(())
}

/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub(crate) async fn run_migrate(config: &AppConfig) -> anyhow::Result<()> {
    let pool = connect(config).await?;
    let applied = finnews_db::run_migrations(&pool).await?;
    println!("applied {applied} migration(s)");
    Ok(())
}
