//! Shared domain types, configuration, and collaborator contracts for finnews.

pub mod alert;
pub mod app_config;
pub mod article;
pub mod config;
pub mod enrichment;
pub mod error;
pub mod index;
pub mod run;
pub mod scoring;
pub mod taxonomy;

pub use alert::{Alert, AlertEntities, AlertLevel};
pub use app_config::{AppConfig, DedupLinkage, Environment};
pub use article::{Article, Cluster};
pub use config::{load_app_config, load_app_config_from_env, DEFAULT_FEEDS};
pub use enrichment::{EntityBundle, ImpactRecord, ImpactType, SentimentLabel, SentimentScore};
pub use error::{ConfigError, ScoringError, StoreError};
pub use index::{IndexEntry, IndexMetadata, QueryIntent, QueryResponse, QueryResult, SearchHit};
pub use run::{RunStage, RunStats};
pub use scoring::{
    ArticleStore, Embedder, EntityClassifier, SentimentClassifier, Summarizer, Summary,
    VectorIndex,
};
pub use taxonomy::{load_taxonomy, Taxonomy};
