//! Database operations for `pipeline_runs`.

use chrono::{DateTime, Utc};
use finnews_core::RunStats;
use sqlx::PgPool;

use crate::{count_to_i64, DbError};

/// A row from the `pipeline_runs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PipelineRunRow {
    pub id: i64,
    pub trigger_source: String,
    pub status: String,
    pub fetched: i64,
    pub new_articles: i64,
    pub unique_articles: i64,
    pub clusters: i64,
    pub indexed: i64,
    pub alerts_sent: i64,
    pub last_stage: Option<String>,
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

const RUN_COLUMNS: &str = "id, trigger_source, status, fetched, new_articles, unique_articles, \
                           clusters, indexed, alerts_sent, last_stage, error_message, \
                           started_at, completed_at";

/// Creates a new run in `running` status.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_pipeline_run(
    pool: &PgPool,
    trigger_source: &str,
) -> Result<PipelineRunRow, DbError> {
    let row = sqlx::query_as::<_, PipelineRunRow>(&format!(
        "INSERT INTO pipeline_runs (trigger_source, status) VALUES ($1, 'running') \
         RETURNING {RUN_COLUMNS}"
    ))
    .bind(trigger_source)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Marks a run as `succeeded` and stores its counters.
///
/// # Errors
///
/// Returns [`DbError::InvalidRunTransition`] if the run is not `running`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn complete_pipeline_run(
    pool: &PgPool,
    id: i64,
    stats: &RunStats,
) -> Result<(), DbError> {
    finish(pool, id, "succeeded", stats, None).await
}

/// Marks a run as `failed`, keeping whatever counters were accumulated.
///
/// # Errors
///
/// Returns [`DbError::InvalidRunTransition`] if the run is not `running`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn fail_pipeline_run(
    pool: &PgPool,
    id: i64,
    stats: &RunStats,
    error_message: &str,
) -> Result<(), DbError> {
    finish(pool, id, "failed", stats, Some(error_message)).await
}

async fn finish(
    pool: &PgPool,
    id: i64,
    status: &str,
    stats: &RunStats,
    error_message: Option<&str>,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE pipeline_runs \
         SET status = $1, fetched = $2, new_articles = $3, unique_articles = $4, \
             clusters = $5, indexed = $6, alerts_sent = $7, last_stage = $8, \
             error_message = $9, completed_at = NOW() \
         WHERE id = $10 AND status = 'running'",
    )
    .bind(status)
    .bind(count_to_i64(stats.fetched))
    .bind(count_to_i64(stats.new))
    .bind(count_to_i64(stats.unique))
    .bind(count_to_i64(stats.clusters))
    .bind(count_to_i64(stats.indexed))
    .bind(count_to_i64(stats.alerts_sent))
    .bind(stats.last_stage.map(|s| s.as_str()))
    .bind(error_message)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidRunTransition {
            id,
            expected_status: "running",
        });
    }

    Ok(())
}

/// Fetches a single run by id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists, or [`DbError::Sqlx`] if the
/// query fails.
pub async fn get_pipeline_run(pool: &PgPool, id: i64) -> Result<PipelineRunRow, DbError> {
    sqlx::query_as::<_, PipelineRunRow>(&format!(
        "SELECT {RUN_COLUMNS} FROM pipeline_runs WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}
