//! Dedup, enrichment, indexing and query over ingested financial news, plus
//! the run orchestration and rate-limited summary path that tie them together.

pub mod alerts;
pub mod dedup;
pub mod enrichment;
pub mod error;
pub mod indexer;
pub mod limiter;
pub mod orchestrator;
pub mod query;
pub mod retry;
pub mod service;
pub mod summarize;
pub mod usage;

pub use alerts::{summary_alerts, sentiment_alert, AlertBroadcaster, SENTIMENT_ALERT_THRESHOLD};
pub use dedup::{cluster_by_similarity, cosine_similarity, DedupClusterer, DedupOutcome};
pub use enrichment::{derive_impacts, EnrichedArticle, EnrichmentStage};
pub use error::{PipelineError, QueryError, RateLimitError, ServiceError};
pub use indexer::{document_text, Indexer};
pub use limiter::RateLimiter;
pub use orchestrator::PipelineOrchestrator;
pub use query::{QueryEngine, DEFAULT_MAX_TOP_K};
pub use retry::{CallError, RetryPolicy};
pub use service::{NewsService, MANUAL_TRIGGER, SCHEDULER_TRIGGER};
pub use summarize::GuardedSummarizer;
pub use usage::{HealthStatus, UsageSnapshot, UsageTracker};
