//! Periodic incremental ingest on a [`JobScheduler`] that can be started,
//! stopped, and fired by hand while the server runs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use finnews_core::RunStats;
use finnews_pipeline::{NewsService, PipelineError, SCHEDULER_TRIGGER};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use uuid::Uuid;

/// Source count above which the interval floor applies.
pub const MANY_SOURCES: usize = 10;
/// Minimum interval when more than [`MANY_SOURCES`] feeds are configured.
pub const MANY_SOURCES_MIN_INTERVAL: Duration = Duration::from_secs(120);

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("scheduler is already running")]
    AlreadyRunning,

    #[error("scheduler is not running")]
    NotRunning,

    #[error("interval must be at least one second")]
    InvalidInterval,

    #[error("job scheduler error: {0}")]
    Job(#[from] JobSchedulerError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

/// Outcome bookkeeping shared between the timer job and manual runs.
#[derive(Debug, Clone, Default, Serialize)]
pub struct JobReport {
    pub total_runs: u64,
    pub last_run_time: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    pub running: bool,
    pub interval_secs: Option<u64>,
    pub next_run: Option<DateTime<Utc>>,
    pub total_runs: u64,
    pub last_run_time: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub last_run_stats: Option<RunStats>,
}

#[derive(Debug, Clone, Copy)]
struct ActiveJob {
    id: Uuid,
    interval: Duration,
}

pub struct IngestScheduler {
    service: Arc<NewsService>,
    scheduler: JobScheduler,
    default_interval: Duration,
    active: Mutex<Option<ActiveJob>>,
    started: AtomicBool,
    report: Arc<StdMutex<JobReport>>,
}

/// Raise `requested` to the floor when many sources are configured.
#[must_use]
pub fn effective_interval(requested: Duration, source_count: usize) -> Duration {
    if source_count > MANY_SOURCES && requested < MANY_SOURCES_MIN_INTERVAL {
        MANY_SOURCES_MIN_INTERVAL
    } else {
        requested
    }
}

impl IngestScheduler {
    /// Create the underlying job scheduler. Its timer loop starts with the
    /// first [`IngestScheduler::start`].
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Job`] if the scheduler cannot be initialised.
    pub async fn new(
        service: Arc<NewsService>,
        default_interval: Duration,
    ) -> Result<Self, SchedulerError> {
        let scheduler = JobScheduler::new().await?;
        Ok(Self {
            service,
            scheduler,
            default_interval,
            active: Mutex::new(None),
            started: AtomicBool::new(false),
            report: Arc::new(StdMutex::new(JobReport::default())),
        })
    }

    /// Register the periodic ingest job. Returns the interval actually used.
    ///
    /// # Errors
    ///
    /// - [`SchedulerError::AlreadyRunning`] if a job is already registered;
    ///   no second timer is created.
    /// - [`SchedulerError::InvalidInterval`] for a zero interval.
    /// - [`SchedulerError::Job`] if the job cannot be registered.
    pub async fn start(&self, interval: Option<Duration>) -> Result<Duration, SchedulerError> {
        let mut active = self.active.lock().await;
        if active.is_some() {
            return Err(SchedulerError::AlreadyRunning);
        }

        let requested = interval.unwrap_or(self.default_interval);
        if requested.as_secs() == 0 {
            return Err(SchedulerError::InvalidInterval);
        }
        let sources = self.service.sources().len();
        let interval = effective_interval(requested, sources);
        if interval != requested {
            tracing::warn!(
                sources,
                requested_secs = requested.as_secs(),
                interval_secs = interval.as_secs(),
                "scheduler: interval raised to protect the store"
            );
        }

        let service = Arc::clone(&self.service);
        let report = Arc::clone(&self.report);
        let job = Job::new_repeated_async(interval, move |_uuid, _lock| {
            let service = Arc::clone(&service);
            let report = Arc::clone(&report);

            Box::pin(async move {
                let _ = run_ingest_job(&service, &report).await;
            })
        })?;
        let id = self.scheduler.add(job).await?;
        if !self.started.swap(true, Ordering::SeqCst) {
            self.scheduler.start().await?;
        }

        *active = Some(ActiveJob { id, interval });
        tracing::info!(interval_secs = interval.as_secs(), "scheduler: ingest job started");
        Ok(interval)
    }

    /// Remove the periodic job. A run already in flight finishes.
    ///
    /// # Errors
    ///
    /// - [`SchedulerError::NotRunning`] if no job is registered.
    /// - [`SchedulerError::Job`] if removal fails.
    pub async fn stop(&self) -> Result<(), SchedulerError> {
        let mut active = self.active.lock().await;
        let Some(job) = *active else {
            return Err(SchedulerError::NotRunning);
        };
        self.scheduler.remove(&job.id).await?;
        *active = None;
        tracing::info!("scheduler: ingest job stopped");
        Ok(())
    }

    /// Run the ingest job once, now, independent of the timer.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Pipeline`] if the run fails or another run
    /// is in progress.
    pub async fn run_now(&self) -> Result<RunStats, SchedulerError> {
        Ok(run_ingest_job(&self.service, &self.report).await?)
    }

    pub async fn status(&self) -> SchedulerStatus {
        let active = *self.active.lock().await;
        let next_run = match active {
            Some(job) => {
                let mut scheduler = self.scheduler.clone();
                scheduler.next_tick_for_job(job.id).await.unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "scheduler: could not read next tick");
                    None
                })
            }
            None => None,
        };
        let report = self.report();

        SchedulerStatus {
            running: active.is_some(),
            interval_secs: active.map(|j| j.interval.as_secs()),
            next_run,
            total_runs: report.total_runs,
            last_run_time: report.last_run_time,
            last_error: report.last_error,
            last_run_stats: self.service.last_run(),
        }
    }

    #[must_use]
    pub fn report(&self) -> JobReport {
        self.report
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Stop the timer and shut the job scheduler down.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Job`] if shutdown fails.
    pub async fn shutdown(&self) -> Result<(), SchedulerError> {
        if let Err(e) = self.stop().await {
            if !matches!(e, SchedulerError::NotRunning) {
                return Err(e);
            }
        }
        let mut scheduler = self.scheduler.clone();
        scheduler.shutdown().await?;
        Ok(())
    }
}

/// Fetch, keep unseen articles, run the pipeline, and record the outcome.
async fn run_ingest_job(
    service: &NewsService,
    report: &StdMutex<JobReport>,
) -> Result<RunStats, PipelineError> {
    tracing::info!("scheduler: starting ingest run");
    let result = service.ingest_new(SCHEDULER_TRIGGER).await;

    let mut r = report.lock().unwrap_or_else(PoisonError::into_inner);
    match &result {
        Ok(stats) => {
            r.total_runs += 1;
            r.last_run_time = Some(Utc::now());
            r.last_error = None;
            tracing::info!(
                new = stats.new,
                indexed = stats.indexed,
                alerts = stats.alerts_sent,
                "scheduler: ingest run complete"
            );
        }
        Err(PipelineError::RunInProgress) => {
            tracing::info!("scheduler: previous run still in progress; tick skipped");
        }
        Err(e) => {
            r.total_runs += 1;
            r.last_run_time = Some(Utc::now());
            r.last_error = Some(e.to_string());
            tracing::error!(error = %e, "scheduler: ingest run failed");
        }
    }
    drop(r);
    result
}
