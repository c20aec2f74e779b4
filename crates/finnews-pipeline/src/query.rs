//! Semantic search with entity-aware reranking.

use std::collections::HashSet;
use std::sync::Arc;

use finnews_core::{
    Embedder, EntityBundle, EntityClassifier, QueryIntent, QueryResponse, QueryResult,
    ScoringError, SearchHit, VectorIndex,
};

use crate::error::QueryError;

pub const DEFAULT_MAX_TOP_K: usize = 50;
/// Candidates fetched per requested result, leaving room for reranking.
const OVERFETCH_FACTOR: usize = 2;

const COMPANY_BOOST: f32 = 0.20;
const SECTOR_BOOST: f32 = 0.15;
const REGULATOR_BOOST: f32 = 0.25;

/// `1 / (1 + distance)`: 1.0 for an exact match, falling toward 0.
#[must_use]
pub fn base_score(distance: f32) -> f32 {
    1.0 / (1.0 + distance.max(0.0))
}

/// Additive boost for each intent entity found (case-insensitive substring)
/// in the document's stored entities.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn entity_boost(intent: &QueryIntent, doc: &EntityBundle) -> f32 {
    fn matches(wanted: &[String], have: &[String]) -> usize {
        let have: Vec<String> = have.iter().map(|h| h.to_lowercase()).collect();
        wanted
            .iter()
            .map(|w| w.to_lowercase())
            .filter(|w| have.iter().any(|h| h.contains(w.as_str())))
            .count()
    }

    matches(&intent.companies, &doc.companies) as f32 * COMPANY_BOOST
        + matches(&intent.sectors, &doc.sectors) as f32 * SECTOR_BOOST
        + matches(&intent.regulators, &doc.regulators) as f32 * REGULATOR_BOOST
}

/// Score, dedup, sort and truncate raw search hits.
#[must_use]
pub fn rank(hits: Vec<SearchHit>, intent: &QueryIntent, top_k: usize) -> Vec<QueryResult> {
    let mut seen = HashSet::new();
    let mut results: Vec<QueryResult> = hits
        .into_iter()
        .filter(|hit| seen.insert(hit.id))
        .map(|hit| {
            let entities = hit.metadata.entities();
            let score = (base_score(hit.distance) + entity_boost(intent, &entities)).min(1.0);
            QueryResult {
                id: hit.id,
                text: hit.text,
                entities,
                score: round3(score),
            }
        })
        .collect();

    // stable: equal scores keep the index's distance order
    results.sort_by(|a, b| b.score.total_cmp(&a.score));
    results.truncate(top_k);
    results
}

fn round3(x: f32) -> f32 {
    (x * 1000.0).round() / 1000.0
}

pub struct QueryEngine {
    entities: Arc<dyn EntityClassifier>,
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    max_top_k: usize,
}

impl QueryEngine {
    #[must_use]
    pub fn new(
        entities: Arc<dyn EntityClassifier>,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
    ) -> Self {
        Self {
            entities,
            embedder,
            index,
            max_top_k: DEFAULT_MAX_TOP_K,
        }
    }

    /// Answer a free-text query with up to `top_k` ranked articles.
    ///
    /// # Errors
    ///
    /// - [`QueryError::EmptyQuery`] for blank text.
    /// - [`QueryError::InvalidTopK`] when `top_k` is 0 or above the maximum.
    /// - [`QueryError::Scoring`] when embedding or the index search fails.
    pub async fn query(&self, text: &str, top_k: usize) -> Result<QueryResponse, QueryError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(QueryError::EmptyQuery);
        }
        if top_k == 0 || top_k > self.max_top_k {
            return Err(QueryError::InvalidTopK {
                got: top_k,
                max: self.max_top_k,
            });
        }

        let intent = match self.entities.classify_entities(text).await {
            Ok(bundle) => QueryIntent::from(bundle.canonicalized()),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "query intent extraction failed; ranking by similarity only"
                );
                QueryIntent::default()
            }
        };

        let vector = self
            .embedder
            .embed(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ScoringError::InvalidResponse("embedder returned no vector".into()))?;

        let hits = self.index.search(&vector, top_k * OVERFETCH_FACTOR).await?;
        let candidates = hits.len();
        let results = rank(hits, &intent, top_k);

        tracing::debug!(
            query = %text,
            candidates,
            returned = results.len(),
            "query answered"
        );

        Ok(QueryResponse {
            query: text.to_string(),
            matched_entities: intent,
            results,
        })
    }
}

#[cfg(test)]
#[path = "query_test.rs"]
mod tests;
