use crate::app_config::{AppConfig, DedupLinkage, Environment};
use crate::ConfigError;

/// Feeds polled when `RSS_FEEDS` is not set.
pub const DEFAULT_FEEDS: &[&str] = &[
    "https://www.moneycontrol.com/rss/latestnews.xml",
    "https://www.moneycontrol.com/rss/MCtopnews.xml",
    "https://www.moneycontrol.com/rss/marketreports.xml",
    "https://economictimes.indiatimes.com/markets/stocks/rssfeeds/2146842.cms",
    "https://economictimes.indiatimes.com/industry/banking/finance/rssfeeds/13358259.cms",
    "https://www.livemint.com/rss/money",
    "https://www.livemint.com/rss/markets",
    "https://www.ndtvprofit.com/rss/business",
    "https://www.ft.com/rss/world/asia-pacific/india",
    "https://www.cnbctv18.com/rss/business.xml",
    "https://news.google.com/rss/search?q=indian+banking+sector&hl=en-IN&gl=IN&ceid=IN:en",
    "https://news.google.com/rss/search?q=RBI+policy+india&hl=en-IN&gl=IN&ceid=IN:en",
];

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so tests can pass a `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;
    use std::str::FromStr;

    fn parse_as<T>(var: &str, raw: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        raw.trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    }

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("FINNEWS_ENV", "development"))?;

    let bind_addr: SocketAddr =
        parse_as("FINNEWS_BIND_ADDR", &or_default("FINNEWS_BIND_ADDR", "0.0.0.0:8000"))?;
    let log_level = or_default("FINNEWS_LOG_LEVEL", "info");
    let taxonomy_path = PathBuf::from(or_default(
        "FINNEWS_TAXONOMY_PATH",
        "./config/taxonomy.yaml",
    ));

    let db_max_connections: u32 = parse_as(
        "FINNEWS_DB_MAX_CONNECTIONS",
        &or_default("FINNEWS_DB_MAX_CONNECTIONS", "10"),
    )?;
    let db_min_connections: u32 = parse_as(
        "FINNEWS_DB_MIN_CONNECTIONS",
        &or_default("FINNEWS_DB_MIN_CONNECTIONS", "1"),
    )?;
    if db_min_connections > db_max_connections {
        return Err(ConfigError::InvalidEnvVar {
            var: "FINNEWS_DB_MIN_CONNECTIONS".to_string(),
            reason: format!(
                "min connections ({db_min_connections}) exceeds max connections ({db_max_connections})"
            ),
        });
    }
    let db_acquire_timeout_secs: u64 = parse_as(
        "FINNEWS_DB_ACQUIRE_TIMEOUT_SECS",
        &or_default("FINNEWS_DB_ACQUIRE_TIMEOUT_SECS", "10"),
    )?;

    let feeds = optional("RSS_FEEDS").map_or_else(
        || DEFAULT_FEEDS.iter().map(|s| (*s).to_string()).collect(),
        |raw| parse_feed_list(&raw),
    );
    if feeds.is_empty() {
        return Err(ConfigError::InvalidEnvVar {
            var: "RSS_FEEDS".to_string(),
            reason: "no feed URLs after splitting on ','".to_string(),
        });
    }

    let fetch_timeout_secs: u64 = parse_as(
        "FINNEWS_FETCH_TIMEOUT_SECS",
        &or_default("FINNEWS_FETCH_TIMEOUT_SECS", "10"),
    )?;
    let fetch_user_agent = or_default("FINNEWS_USER_AGENT", DEFAULT_USER_AGENT);
    let max_concurrent_feeds: usize = parse_as(
        "FINNEWS_MAX_CONCURRENT_FEEDS",
        &or_default("FINNEWS_MAX_CONCURRENT_FEEDS", "16"),
    )?;
    let max_age_hours: i64 = parse_as("MAX_AGE_HOURS", &or_default("MAX_AGE_HOURS", "168"))?;

    let dedup_threshold: f32 = parse_as(
        "FINNEWS_DEDUP_THRESHOLD",
        &or_default("FINNEWS_DEDUP_THRESHOLD", "0.80"),
    )?;
    if !(0.0..=1.0).contains(&dedup_threshold) {
        return Err(ConfigError::InvalidEnvVar {
            var: "FINNEWS_DEDUP_THRESHOLD".to_string(),
            reason: format!("{dedup_threshold} is outside [0, 1]"),
        });
    }
    let dedup_linkage = parse_linkage(&or_default("FINNEWS_DEDUP_LINKAGE", "seed"))?;

    let tei_url = or_default("FINNEWS_TEI_URL", "http://localhost:8080");
    let qdrant_url = optional("FINNEWS_QDRANT_URL");
    let qdrant_collection = or_default("FINNEWS_QDRANT_COLLECTION", "financial_news");
    let embedding_dim: u64 = parse_as(
        "FINNEWS_EMBEDDING_DIM",
        &or_default("FINNEWS_EMBEDDING_DIM", "384"),
    )?;

    let gemini_api_key = optional("GEMINI_API_KEY");
    let gemini_model = or_default("FINNEWS_GEMINI_MODEL", "gemini-2.5-flash");
    let llm_max_calls_per_minute: usize = parse_as(
        "FINNEWS_LLM_MAX_CALLS_PER_MINUTE",
        &or_default("FINNEWS_LLM_MAX_CALLS_PER_MINUTE", "60"),
    )?;
    let llm_max_calls_per_run: usize = parse_as(
        "FINNEWS_LLM_MAX_CALLS_PER_RUN",
        &or_default("FINNEWS_LLM_MAX_CALLS_PER_RUN", "5"),
    )?;
    let llm_max_retries: u32 = parse_as(
        "FINNEWS_LLM_MAX_RETRIES",
        &or_default("FINNEWS_LLM_MAX_RETRIES", "3"),
    )?;

    let ingest_interval_secs: u64 =
        parse_as("INGEST_INTERVAL", &or_default("INGEST_INTERVAL", "60"))?;
    if ingest_interval_secs == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "INGEST_INTERVAL".to_string(),
            reason: "interval must be at least 1 second".to_string(),
        });
    }
    let auto_start_scheduler = parse_bool(
        "AUTO_START_SCHEDULER",
        &or_default("AUTO_START_SCHEDULER", "false"),
    )?;

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        taxonomy_path,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        feeds,
        fetch_timeout_secs,
        fetch_user_agent,
        max_concurrent_feeds,
        max_age_hours,
        dedup_threshold,
        dedup_linkage,
        tei_url,
        qdrant_url,
        qdrant_collection,
        embedding_dim,
        gemini_api_key,
        gemini_model,
        llm_max_calls_per_minute,
        llm_max_calls_per_run,
        llm_max_retries,
        ingest_interval_secs,
        auto_start_scheduler,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        _ => Err(ConfigError::InvalidEnvVar {
            var: "FINNEWS_ENV".to_string(),
            reason: format!("unknown environment '{s}'; expected development, test, or production"),
        }),
    }
}

fn parse_linkage(s: &str) -> Result<DedupLinkage, ConfigError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "seed" => Ok(DedupLinkage::Seed),
        "complete" => Ok(DedupLinkage::Complete),
        other => Err(ConfigError::InvalidEnvVar {
            var: "FINNEWS_DEDUP_LINKAGE".to_string(),
            reason: format!("unknown linkage '{other}'; expected seed or complete"),
        }),
    }
}

fn parse_bool(var: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: format!("'{other}' is not a boolean"),
        }),
    }
}

fn parse_feed_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
