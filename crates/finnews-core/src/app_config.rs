use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// How the dedup clusterer decides cluster membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupLinkage {
    /// Compare each candidate against the cluster seed only.
    Seed,
    /// A candidate must clear the threshold against every member already in the cluster.
    Complete,
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub taxonomy_path: PathBuf,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub feeds: Vec<String>,
    pub fetch_timeout_secs: u64,
    pub fetch_user_agent: String,
    pub max_concurrent_feeds: usize,
    pub max_age_hours: i64,
    pub dedup_threshold: f32,
    pub dedup_linkage: DedupLinkage,
    pub tei_url: String,
    pub qdrant_url: Option<String>,
    pub qdrant_collection: String,
    pub embedding_dim: u64,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub llm_max_calls_per_minute: usize,
    pub llm_max_calls_per_run: usize,
    pub llm_max_retries: u32,
    pub ingest_interval_secs: u64,
    pub auto_start_scheduler: bool,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("taxonomy_path", &self.taxonomy_path)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("feeds", &self.feeds.len())
            .field("fetch_timeout_secs", &self.fetch_timeout_secs)
            .field("fetch_user_agent", &self.fetch_user_agent)
            .field("max_concurrent_feeds", &self.max_concurrent_feeds)
            .field("max_age_hours", &self.max_age_hours)
            .field("dedup_threshold", &self.dedup_threshold)
            .field("dedup_linkage", &self.dedup_linkage)
            .field("tei_url", &self.tei_url)
            .field("qdrant_url", &self.qdrant_url)
            .field("qdrant_collection", &self.qdrant_collection)
            .field("embedding_dim", &self.embedding_dim)
            .field(
                "gemini_api_key",
                &self.gemini_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("gemini_model", &self.gemini_model)
            .field("llm_max_calls_per_minute", &self.llm_max_calls_per_minute)
            .field("llm_max_calls_per_run", &self.llm_max_calls_per_run)
            .field("llm_max_retries", &self.llm_max_retries)
            .field("ingest_interval_secs", &self.ingest_interval_secs)
            .field("auto_start_scheduler", &self.auto_start_scheduler)
            .finish()
    }
}
