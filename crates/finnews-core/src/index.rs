use serde::{Deserialize, Serialize};

use crate::article::Article;
use crate::enrichment::{EntityBundle, SentimentLabel, SentimentScore};

const LIST_DELIMITER: &str = ",";

/// Flattened, join-free metadata stored next to each vector.
///
/// Entity lists are delimiter-joined strings so vector stores that only accept
/// scalar payload values can hold them, and retrieval-time boosting needs no
/// lookup in the primary store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexMetadata {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub published_at: String,
    #[serde(default)]
    pub companies: String,
    #[serde(default)]
    pub sectors: String,
    #[serde(default)]
    pub regulators: String,
    #[serde(default)]
    pub events: String,
    #[serde(default)]
    pub sentiment_label: Option<SentimentLabel>,
    #[serde(default)]
    pub sentiment_score: Option<f32>,
}

impl IndexMetadata {
    #[must_use]
    pub fn new(
        article: &Article,
        entities: &EntityBundle,
        sentiment: Option<&SentimentScore>,
    ) -> Self {
        Self {
            title: article.title.clone(),
            source: article.source.clone(),
            published_at: article.published_at.to_rfc3339(),
            companies: entities.companies.join(LIST_DELIMITER),
            sectors: entities.sectors.join(LIST_DELIMITER),
            regulators: entities.regulators.join(LIST_DELIMITER),
            events: entities.events.join(LIST_DELIMITER),
            sentiment_label: sentiment.map(|s| s.label),
            sentiment_score: sentiment.map(|s| s.confidence),
        }
    }

    /// Split the stored lists back into an entity bundle (without impacts).
    #[must_use]
    pub fn entities(&self) -> EntityBundle {
        EntityBundle {
            companies: split_list(&self.companies),
            sectors: split_list(&self.sectors),
            regulators: split_list(&self.regulators),
            people: Vec::new(),
            events: split_list(&self.events),
            impacts: Vec::new(),
        }
    }
}

fn split_list(joined: &str) -> Vec<String> {
    joined
        .split(LIST_DELIMITER)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

/// One document in the vector index. Upserting an existing id replaces the
/// whole entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: i64,
    pub embedding: Vec<f32>,
    pub text: String,
    pub metadata: IndexMetadata,
}

/// A nearest-neighbor search result. Smaller `distance` means closer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: i64,
    pub distance: f32,
    pub text: String,
    pub metadata: IndexMetadata,
}

/// Structured intent extracted from a query string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryIntent {
    pub companies: Vec<String>,
    pub sectors: Vec<String>,
    pub regulators: Vec<String>,
}

impl QueryIntent {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.companies.is_empty() && self.sectors.is_empty() && self.regulators.is_empty()
    }
}

impl From<EntityBundle> for QueryIntent {
    fn from(bundle: EntityBundle) -> Self {
        Self {
            companies: bundle.companies,
            sectors: bundle.sectors,
            regulators: bundle.regulators,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub id: i64,
    pub text: String,
    pub entities: EntityBundle,
    /// Final ranking score in `[0.0, 1.0]`.
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub query: String,
    pub matched_entities: QueryIntent,
    pub results: Vec<QueryResult>,
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn article() -> Article {
        Article {
            id: 7,
            title: "RBI holds repo rate".to_string(),
            text: "RBI holds repo rate.".to_string(),
            source: "https://example.com/rss".to_string(),
            published_at: Utc::now(),
            content_hash: "abc".to_string(),
            ingested_at: Utc::now(),
        }
    }

    #[test]
    fn metadata_lists_survive_join_and_split() {
        let entities = EntityBundle {
            companies: vec!["HDFC Bank".to_string(), "ICICI Bank".to_string()],
            regulators: vec!["RBI".to_string()],
            ..EntityBundle::default()
        };
        let meta = IndexMetadata::new(&article(), &entities, None);

        assert_eq!(meta.companies, "HDFC Bank,ICICI Bank");
        let back = meta.entities();
        assert_eq!(back.companies, entities.companies);
        assert_eq!(back.regulators, entities.regulators);
        assert!(back.sectors.is_empty());
    }

    #[test]
    fn metadata_records_sentiment() {
        let sentiment = SentimentScore::new(SentimentLabel::Negative, 0.93);
        let meta = IndexMetadata::new(&article(), &EntityBundle::default(), Some(&sentiment));
        assert_eq!(meta.sentiment_label, Some(SentimentLabel::Negative));
        assert_eq!(meta.sentiment_score, Some(0.93));
    }
}
