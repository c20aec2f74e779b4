//! Runs one batch of articles through every pipeline stage in order.
//!
//! `INGESTED -> DEDUPED -> ENTITIES_EXTRACTED -> SENTIMENT_SCORED ->
//! SUMMARIZED -> INDEXED -> DONE`. A failure in a required stage ends the run
//! with the counters collected so far; nothing already written is rolled back.
//! The summary stage is optional and never fails the run.

use std::sync::{Arc, PoisonError, RwLock};

use chrono::Utc;
use finnews_core::{Article, ArticleStore, RunStage, RunStats};
use tokio::sync::Mutex;

use crate::alerts::{self, AlertBroadcaster};
use crate::dedup::DedupClusterer;
use crate::enrichment::{EnrichedArticle, EnrichmentStage};
use crate::error::PipelineError;
use crate::indexer::Indexer;
use crate::summarize::GuardedSummarizer;

type StageResult<T> = Result<T, (RunStage, String)>;

pub struct PipelineOrchestrator {
    store: Arc<dyn ArticleStore>,
    dedup: DedupClusterer,
    enrichment: EnrichmentStage,
    summarizer: Option<GuardedSummarizer>,
    indexer: Indexer,
    alerts: AlertBroadcaster,
    run_guard: Mutex<()>,
    last_run: RwLock<Option<RunStats>>,
}

impl PipelineOrchestrator {
    #[must_use]
    pub fn new(
        store: Arc<dyn ArticleStore>,
        dedup: DedupClusterer,
        enrichment: EnrichmentStage,
        summarizer: Option<GuardedSummarizer>,
        indexer: Indexer,
        alerts: AlertBroadcaster,
    ) -> Self {
        Self {
            store,
            dedup,
            enrichment,
            summarizer,
            indexer,
            alerts,
            run_guard: Mutex::new(()),
            last_run: RwLock::new(None),
        }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn ArticleStore> {
        &self.store
    }

    #[must_use]
    pub fn alerts(&self) -> &AlertBroadcaster {
        &self.alerts
    }

    /// Stats of the most recently finished run, successful or not. Never
    /// waits on a run in flight.
    #[must_use]
    pub fn last_run(&self) -> Option<RunStats> {
        self.last_run
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.run_guard.try_lock().is_err()
    }

    /// Run `articles` through the pipeline. `trigger` labels the run record.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::RunInProgress`] if another run holds the guard; the
    ///   second trigger does nothing.
    /// - [`PipelineError::StageFailed`] if a required stage fails.
    pub async fn run(
        &self,
        articles: Vec<Article>,
        trigger: &str,
    ) -> Result<RunStats, PipelineError> {
        let fetched = articles.len();
        self.run_with_fetched(articles, fetched, trigger).await
    }

    /// Like [`run`](Self::run), but records `fetched` as the number of
    /// articles pulled from the feeds when `articles` is a filtered subset.
    ///
    /// # Errors
    ///
    /// Same as [`run`](Self::run).
    pub async fn run_with_fetched(
        &self,
        articles: Vec<Article>,
        fetched: usize,
        trigger: &str,
    ) -> Result<RunStats, PipelineError> {
        let Ok(_guard) = self.run_guard.try_lock() else {
            tracing::info!(trigger, "pipeline run skipped: another run is in progress");
            return Err(PipelineError::RunInProgress);
        };

        let mut stats = RunStats::started(fetched);
        let run_id = match self.store.start_run(trigger).await {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!(error = %e, "failed to record pipeline run start");
                None
            }
        };
        tracing::info!(trigger, run_id, fetched = stats.fetched, "pipeline run started");

        let outcome = self.execute(articles, &mut stats).await;
        stats.finished_at = Some(Utc::now());

        let error_message = outcome
            .as_ref()
            .err()
            .map(|(stage, message)| format!("{stage}: {message}"));
        if let Some(id) = run_id {
            if let Err(e) = self
                .store
                .finish_run(id, &stats, error_message.as_deref())
                .await
            {
                tracing::warn!(run_id = id, error = %e, "failed to record pipeline run outcome");
            }
        }
        *self.last_run.write().unwrap_or_else(PoisonError::into_inner) = Some(stats.clone());

        match outcome {
            Ok(()) => {
                tracing::info!(
                    run_id,
                    new = stats.new,
                    unique = stats.unique,
                    clusters = stats.clusters,
                    summarized = stats.summarized,
                    indexed = stats.indexed,
                    alerts = stats.alerts_sent,
                    "pipeline run complete"
                );
                Ok(stats)
            }
            Err((stage, message)) => {
                tracing::error!(run_id, stage = %stage, error = %message, "pipeline run failed");
                Err(PipelineError::StageFailed {
                    stage,
                    message,
                    stats: Box::new(stats),
                })
            }
        }
    }

    async fn execute(&self, articles: Vec<Article>, stats: &mut RunStats) -> StageResult<()> {
        stats.new = self
            .store
            .upsert(&articles)
            .await
            .map_err(|e| (RunStage::Ingested, e.to_string()))?;
        advance(stats, RunStage::Ingested);

        let outcome = self
            .dedup
            .cluster(articles)
            .await
            .map_err(|e| (RunStage::Deduped, e.to_string()))?;
        self.store
            .save_clusters(&outcome.clusters)
            .await
            .map_err(|e| (RunStage::Deduped, e.to_string()))?;
        stats.unique = outcome.unique.len();
        stats.clusters = outcome.clusters.len();
        advance(stats, RunStage::Deduped);

        let mut enriched = self.enrichment.extract_entities(outcome.unique).await;
        advance(stats, RunStage::EntitiesExtracted);

        self.enrichment.score_sentiment(&mut enriched).await;
        for item in &enriched {
            let Some(sentiment) = item.sentiment.as_ref() else {
                continue;
            };
            let alert = alerts::sentiment_alert(
                item.article.id,
                &item.article.text,
                sentiment,
                &item.entities,
            );
            if let Some(alert) = alert {
                self.alerts.publish(alert);
                stats.alerts_sent += 1;
            }
        }
        EnrichmentStage::persist(self.store.as_ref(), &enriched)
            .await
            .map_err(|e| (RunStage::SentimentScored, e.to_string()))?;
        advance(stats, RunStage::SentimentScored);

        self.summarize(&mut enriched, stats).await;
        advance(stats, RunStage::Summarized);

        stats.indexed = self
            .indexer
            .index(&enriched)
            .await
            .map_err(|e| (RunStage::Indexed, e.to_string()))?;
        advance(stats, RunStage::Indexed);

        advance(stats, RunStage::Done);
        Ok(())
    }

    async fn summarize(&self, articles: &mut [EnrichedArticle], stats: &mut RunStats) {
        let Some(summarizer) = &self.summarizer else {
            return;
        };
        summarizer.begin_run();
        let keywords = &self.enrichment.taxonomy().alert_keywords;

        for item in articles.iter_mut() {
            let Some(summary) = summarizer.summarize(item.article.id, &item.article.text).await
            else {
                continue;
            };
            for alert in alerts::summary_alerts(
                item.article.id,
                &item.article.text,
                &summary,
                item.sentiment.map(|s| s.label),
                &item.entities,
                keywords,
            ) {
                self.alerts.publish(alert);
                stats.alerts_sent += 1;
            }
            item.summary = Some(summary);
            stats.summarized += 1;
        }
    }
}

fn advance(stats: &mut RunStats, stage: RunStage) {
    tracing::debug!(stage = %stage, "pipeline stage complete");
    stats.last_stage = Some(stage);
}

#[cfg(test)]
#[path = "orchestrator_test.rs"]
mod tests;
