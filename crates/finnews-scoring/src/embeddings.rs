//! TEI (Text Embeddings Inference) client for vector generation.

use async_trait::async_trait;
use finnews_core::{Embedder, ScoringError};
use serde::Serialize;

use crate::status_error;

/// Maximum number of texts per /embed call.
const BATCH_SIZE: usize = 64;

pub struct TeiEmbedder {
    client: reqwest::Client,
    url: String,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    inputs: &'a [String],
}

impl TeiEmbedder {
    #[must_use]
    pub fn new(tei_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: format!("{}/embed", tei_url.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl Embedder for TeiEmbedder {
    /// Texts are sent in groups of [`BATCH_SIZE`]; output order matches input.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ScoringError> {
        let mut all_embeddings = Vec::with_capacity(texts.len());

        for chunk in texts.chunks(BATCH_SIZE) {
            let response = self
                .client
                .post(&self.url)
                .json(&EmbedRequest { inputs: chunk })
                .send()
                .await
                .map_err(|e| ScoringError::Unavailable(format!("TEI request failed: {e}")))?;

            if !response.status().is_success() {
                return Err(status_error("TEI", response.status()));
            }

            let embeddings: Vec<Vec<f32>> = response.json().await.map_err(|e| {
                ScoringError::InvalidResponse(format!("TEI response parse error: {e}"))
            })?;

            if embeddings.len() != chunk.len() {
                return Err(ScoringError::InvalidResponse(format!(
                    "TEI returned {} embeddings for {} inputs",
                    embeddings.len(),
                    chunk.len()
                )));
            }

            all_embeddings.extend(embeddings);
        }

        Ok(all_embeddings)
    }
}
