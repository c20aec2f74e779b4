//! Postgres-backed [`ArticleStore`].

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use finnews_core::{
    Article, ArticleStore, Cluster, EntityBundle, RunStats, SentimentScore, StoreError,
};
use sqlx::types::Json;
use sqlx::PgPool;

use crate::batching::{upsert_in_batches, TRANSIENT_RETRY_DELAY, UPSERT_BATCH_SIZE};
use crate::{pipeline_runs, DbError};

#[derive(Debug, Clone)]
pub struct PgArticleStore {
    pool: PgPool,
}

impl PgArticleStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Insert one batch with a single statement; rows whose `content_hash` or `id`
/// already exist are skipped by the database.
async fn insert_article_batch(pool: &PgPool, batch: &[Article]) -> Result<usize, DbError> {
    let mut ids: Vec<i64> = Vec::with_capacity(batch.len());
    let mut titles: Vec<&str> = Vec::with_capacity(batch.len());
    let mut texts: Vec<&str> = Vec::with_capacity(batch.len());
    let mut sources: Vec<&str> = Vec::with_capacity(batch.len());
    let mut published: Vec<DateTime<Utc>> = Vec::with_capacity(batch.len());
    let mut hashes: Vec<&str> = Vec::with_capacity(batch.len());
    let mut ingested: Vec<DateTime<Utc>> = Vec::with_capacity(batch.len());

    for article in batch {
        ids.push(article.id);
        titles.push(&article.title);
        texts.push(&article.text);
        sources.push(&article.source);
        published.push(article.published_at);
        hashes.push(&article.content_hash);
        ingested.push(article.ingested_at);
    }

    let result = sqlx::query(
        "INSERT INTO articles (id, title, text, source, published_at, content_hash, ingested_at) \
         SELECT * FROM UNNEST($1::bigint[], $2::text[], $3::text[], $4::text[], \
                              $5::timestamptz[], $6::text[], $7::timestamptz[]) \
         ON CONFLICT DO NOTHING",
    )
    .bind(&ids)
    .bind(&titles)
    .bind(&texts)
    .bind(&sources)
    .bind(&published)
    .bind(&hashes)
    .bind(&ingested)
    .execute(pool)
    .await?;

    Ok(usize::try_from(result.rows_affected()).unwrap_or(usize::MAX))
}

#[async_trait]
impl ArticleStore for PgArticleStore {
    async fn existing(&self, ids: &[i64]) -> Result<HashSet<i64>, StoreError> {
        if ids.is_empty() {
            return Ok(HashSet::new());
        }
        let rows: Vec<i64> = sqlx::query_scalar("SELECT id FROM articles WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::from)?;
        Ok(rows.into_iter().collect())
    }

    async fn existing_hashes(&self, hashes: &[String]) -> Result<HashSet<String>, StoreError> {
        if hashes.is_empty() {
            return Ok(HashSet::new());
        }
        let rows: Vec<String> =
            sqlx::query_scalar("SELECT content_hash FROM articles WHERE content_hash = ANY($1)")
                .bind(hashes)
                .fetch_all(&self.pool)
                .await
                .map_err(DbError::from)?;
        Ok(rows.into_iter().collect())
    }

    async fn upsert(&self, articles: &[Article]) -> Result<usize, StoreError> {
        let pool = &self.pool;
        let inserted = upsert_in_batches(
            articles,
            UPSERT_BATCH_SIZE,
            TRANSIENT_RETRY_DELAY,
            |batch| async move {
                insert_article_batch(pool, batch)
                    .await
                    .map_err(StoreError::from)
            },
        )
        .await?;

        tracing::debug!(
            attempted = articles.len(),
            inserted,
            "articles upserted"
        );
        Ok(inserted)
    }

    async fn save_clusters(&self, clusters: &[Cluster]) -> Result<(), StoreError> {
        if clusters.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;
        for cluster in clusters {
            sqlx::query(
                "INSERT INTO dedup_clusters (main_id, merged_ids) VALUES ($1, $2) \
                 ON CONFLICT (main_id) DO UPDATE \
                 SET merged_ids = EXCLUDED.merged_ids, updated_at = NOW()",
            )
            .bind(cluster.main_id)
            .bind(&cluster.merged_ids)
            .execute(&mut *tx)
            .await
            .map_err(DbError::from)?;
        }
        tx.commit().await.map_err(DbError::from)?;
        Ok(())
    }

    async fn save_enrichment(
        &self,
        article_id: i64,
        entities: &EntityBundle,
        sentiment: &SentimentScore,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        sqlx::query(
            "INSERT INTO article_entities \
                 (article_id, companies, sectors, regulators, people, events, impacts) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (article_id) DO UPDATE SET \
                 companies = EXCLUDED.companies, sectors = EXCLUDED.sectors, \
                 regulators = EXCLUDED.regulators, people = EXCLUDED.people, \
                 events = EXCLUDED.events, impacts = EXCLUDED.impacts, updated_at = NOW()",
        )
        .bind(article_id)
        .bind(Json(&entities.companies))
        .bind(Json(&entities.sectors))
        .bind(Json(&entities.regulators))
        .bind(Json(&entities.people))
        .bind(Json(&entities.events))
        .bind(Json(&entities.impacts))
        .execute(&mut *tx)
        .await
        .map_err(DbError::from)?;

        sqlx::query(
            "INSERT INTO article_sentiment (article_id, label, confidence) VALUES ($1, $2, $3) \
             ON CONFLICT (article_id) DO UPDATE SET \
                 label = EXCLUDED.label, confidence = EXCLUDED.confidence, updated_at = NOW()",
        )
        .bind(article_id)
        .bind(sentiment.label.to_string())
        .bind(sentiment.confidence)
        .execute(&mut *tx)
        .await
        .map_err(DbError::from)?;

        tx.commit().await.map_err(DbError::from)?;
        Ok(())
    }

    async fn start_run(&self, trigger: &str) -> Result<i64, StoreError> {
        let row = pipeline_runs::create_pipeline_run(&self.pool, trigger).await?;
        Ok(row.id)
    }

    async fn finish_run(
        &self,
        run_id: i64,
        stats: &RunStats,
        error: Option<&str>,
    ) -> Result<(), StoreError> {
        match error {
            None => pipeline_runs::complete_pipeline_run(&self.pool, run_id, stats).await?,
            Some(message) => {
                pipeline_runs::fail_pipeline_run(&self.pool, run_id, stats, message).await?;
            }
        }
        Ok(())
    }
}
