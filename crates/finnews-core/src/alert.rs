use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enrichment::{EntityBundle, SentimentLabel};

const HEADLINE_MAX_CHARS: usize = 120;
const SUMMARY_MAX_CHARS: usize = 200;
const MAX_ALERT_COMPANIES: usize = 3;
const MAX_ALERT_REGULATORS: usize = 2;
const MAX_ALERT_SECTORS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertLevel {
    HighRisk,
    Bullish,
    RegulatoryUpdate,
    EarningsUpdate,
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AlertLevel::HighRisk => "HIGH_RISK",
            AlertLevel::Bullish => "BULLISH",
            AlertLevel::RegulatoryUpdate => "REGULATORY_UPDATE",
            AlertLevel::EarningsUpdate => "EARNINGS_UPDATE",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertEntities {
    pub companies: Vec<String>,
    pub regulators: Vec<String>,
    pub sectors: Vec<String>,
}

impl From<&EntityBundle> for AlertEntities {
    fn from(bundle: &EntityBundle) -> Self {
        Self {
            companies: bundle.companies.iter().take(MAX_ALERT_COMPANIES).cloned().collect(),
            regulators: bundle
                .regulators
                .iter()
                .take(MAX_ALERT_REGULATORS)
                .cloned()
                .collect(),
            sectors: bundle.sectors.iter().take(MAX_ALERT_SECTORS).cloned().collect(),
        }
    }
}

/// A structured event fanned out to alert subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub level: AlertLevel,
    pub article_id: i64,
    pub headline: String,
    pub sentiment: Option<SentimentLabel>,
    pub entities: AlertEntities,
    pub summary: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Alert {
    #[must_use]
    pub fn new(
        level: AlertLevel,
        article_id: i64,
        text: &str,
        sentiment: Option<SentimentLabel>,
        entities: &EntityBundle,
        summary: Option<&str>,
    ) -> Self {
        Self {
            level,
            article_id,
            headline: truncate_with_ellipsis(text, HEADLINE_MAX_CHARS),
            sentiment,
            entities: AlertEntities::from(entities),
            summary: summary.map(|s| truncate_with_ellipsis(s, SUMMARY_MAX_CHARS)),
            timestamp: Utc::now(),
        }
    }
}

fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push_str("...");
    out
}
