//! Qdrant vector index over its REST API.

use async_trait::async_trait;
use finnews_core::{IndexEntry, IndexMetadata, ScoringError, SearchHit, VectorIndex};
use serde::{Deserialize, Serialize};

use crate::status_error;

const TEXT_FIELD: &str = "text";

pub struct QdrantIndex {
    client: reqwest::Client,
    base_url: String,
    collection: String,
    dimension: u64,
}

#[derive(Serialize)]
struct CreateCollectionRequest {
    vectors: VectorsConfig,
}

#[derive(Serialize)]
struct VectorsConfig {
    size: u64,
    distance: &'static str,
}

#[derive(Serialize)]
struct UpsertPointsRequest {
    points: Vec<Point>,
}

#[derive(Serialize)]
struct Point {
    id: u64,
    vector: Vec<f32>,
    payload: serde_json::Map<String, serde_json::Value>,
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    vector: &'a [f32],
    limit: usize,
    with_payload: bool,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    result: Vec<ScoredPoint>,
}

#[derive(Deserialize)]
struct ScoredPoint {
    id: serde_json::Value,
    score: f32,
    #[serde(default)]
    payload: serde_json::Map<String, serde_json::Value>,
}

impl QdrantIndex {
    #[must_use]
    pub fn new(qdrant_url: &str, collection: &str, dimension: u64) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: qdrant_url.trim_end_matches('/').to_string(),
            collection: collection.to_string(),
            dimension,
        }
    }

    fn collection_url(&self) -> String {
        format!("{}/collections/{}", self.base_url, self.collection)
    }

    /// Create the collection (cosine distance) unless it already exists.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError`] on network or API failure.
    pub async fn ensure_collection(&self) -> Result<(), ScoringError> {
        let url = self.collection_url();
        if let Ok(resp) = self.client.get(&url).send().await {
            if resp.status().is_success() {
                return Ok(());
            }
        }

        let body = CreateCollectionRequest {
            vectors: VectorsConfig {
                size: self.dimension,
                distance: "Cosine",
            },
        };
        let resp = self
            .client
            .put(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                ScoringError::Unavailable(format!("collection create request failed: {e}"))
            })?;

        if !resp.status().is_success() {
            return Err(status_error("Qdrant collection create", resp.status()));
        }
        tracing::info!(
            collection = %self.collection,
            dimension = self.dimension,
            "qdrant collection created"
        );
        Ok(())
    }
}

fn to_point(entry: IndexEntry) -> Result<Point, ScoringError> {
    let id = u64::try_from(entry.id)
        .map_err(|_| ScoringError::Rejected(format!("negative point id {}", entry.id)))?;

    let mut payload = match serde_json::to_value(&entry.metadata) {
        Ok(serde_json::Value::Object(map)) => map,
        Ok(_) => serde_json::Map::new(),
        Err(e) => {
            return Err(ScoringError::Rejected(format!(
                "metadata for {} is not serializable: {e}",
                entry.id
            )))
        }
    };
    payload.insert(TEXT_FIELD.to_string(), serde_json::Value::String(entry.text));

    Ok(Point {
        id,
        vector: entry.embedding,
        payload,
    })
}

fn to_hit(point: ScoredPoint) -> Option<SearchHit> {
    let id = point.id.as_u64().and_then(|v| i64::try_from(v).ok())?;
    let mut payload = point.payload;
    let text = match payload.remove(TEXT_FIELD) {
        Some(serde_json::Value::String(s)) => s,
        _ => String::new(),
    };
    let metadata: IndexMetadata =
        serde_json::from_value(serde_json::Value::Object(payload)).unwrap_or_default();

    Some(SearchHit {
        id,
        // cosine similarity in [-1, 1] -> distance where smaller is closer
        distance: (1.0 - point.score).max(0.0),
        text,
        metadata,
    })
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    async fn upsert(&self, entries: Vec<IndexEntry>) -> Result<usize, ScoringError> {
        if entries.is_empty() {
            return Ok(0);
        }
        let points = entries
            .into_iter()
            .map(to_point)
            .collect::<Result<Vec<_>, _>>()?;
        let count = points.len();

        let resp = self
            .client
            .put(format!("{}/points?wait=true", self.collection_url()))
            .json(&UpsertPointsRequest { points })
            .send()
            .await
            .map_err(|e| ScoringError::Unavailable(format!("upsert request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(status_error("Qdrant upsert", resp.status()));
        }
        Ok(count)
    }

    async fn search(&self, vector: &[f32], n: usize) -> Result<Vec<SearchHit>, ScoringError> {
        if n == 0 {
            return Ok(Vec::new());
        }
        let resp = self
            .client
            .post(format!("{}/points/search", self.collection_url()))
            .json(&SearchRequest {
                vector,
                limit: n,
                with_payload: true,
            })
            .send()
            .await
            .map_err(|e| ScoringError::Unavailable(format!("search request failed: {e}")))?;

        // A collection that was never created is an empty index.
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !resp.status().is_success() {
            return Err(status_error("Qdrant search", resp.status()));
        }

        let body: SearchResponse = resp.json().await.map_err(|e| {
            ScoringError::InvalidResponse(format!("search response parse error: {e}"))
        })?;
        Ok(body.result.into_iter().filter_map(to_hit).collect())
    }
}
