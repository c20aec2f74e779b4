//! Brute-force in-process vector index, used when no Qdrant URL is configured
//! and in tests.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use finnews_core::{IndexEntry, ScoringError, SearchHit, VectorIndex};

/// Euclidean distance; closest first, ties broken by id.
#[derive(Debug, Default)]
pub struct MemoryIndex {
    entries: RwLock<BTreeMap<i64, IndexEntry>>,
}

impl MemoryIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn get(&self, id: i64) -> Option<IndexEntry> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }
}

fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn upsert(&self, entries: Vec<IndexEntry>) -> Result<usize, ScoringError> {
        let count = entries.len();
        let mut map = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        for entry in entries {
            map.insert(entry.id, entry);
        }
        Ok(count)
    }

    async fn search(&self, vector: &[f32], n: usize) -> Result<Vec<SearchHit>, ScoringError> {
        let map = self.entries.read().unwrap_or_else(PoisonError::into_inner);

        let mut hits = Vec::with_capacity(map.len());
        for entry in map.values() {
            if entry.embedding.len() != vector.len() {
                return Err(ScoringError::Rejected(format!(
                    "query dimension {} does not match indexed dimension {}",
                    vector.len(),
                    entry.embedding.len()
                )));
            }
            hits.push(SearchHit {
                id: entry.id,
                distance: l2_distance(&entry.embedding, vector),
                text: entry.text.clone(),
                metadata: entry.metadata.clone(),
            });
        }

        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.id.cmp(&b.id)));
        hits.truncate(n);
        Ok(hits)
    }
}
