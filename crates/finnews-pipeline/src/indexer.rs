//! Embeds enriched articles and writes them to the vector index.

use std::sync::Arc;

use finnews_core::{Embedder, IndexEntry, IndexMetadata, ScoringError, VectorIndex};

use crate::enrichment::EnrichedArticle;

/// Document text stored and embedded for one article.
#[must_use]
pub fn document_text(article: &EnrichedArticle) -> String {
    match article.summary.as_deref() {
        Some(summary) if !summary.is_empty() => {
            format!("{}\n\nSummary: {summary}", article.article.text)
        }
        _ => article.article.text.clone(),
    }
}

pub struct Indexer {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
}

impl Indexer {
    #[must_use]
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>) -> Self {
        Self { embedder, index }
    }

    /// Embed and upsert every article, replacing any prior entry with the same id.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError`] if embedding or the index write fails, or the
    /// embedder returns the wrong number of vectors.
    pub async fn index(&self, articles: &[EnrichedArticle]) -> Result<usize, ScoringError> {
        if articles.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = articles.iter().map(document_text).collect();
        let vectors = self.embedder.embed(&texts).await?;
        if vectors.len() != articles.len() {
            return Err(ScoringError::InvalidResponse(format!(
                "embedder returned {} vectors for {} documents",
                vectors.len(),
                articles.len()
            )));
        }

        let entries = articles
            .iter()
            .zip(texts)
            .zip(vectors)
            .map(|((a, text), embedding)| IndexEntry {
                id: a.article.id,
                embedding,
                text,
                metadata: IndexMetadata::new(&a.article, &a.entities, a.sentiment.as_ref()),
            })
            .collect();

        self.index.upsert(entries).await
    }
}
