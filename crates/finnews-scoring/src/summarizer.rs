//! Gemini `generateContent` client used for the optional summary stage.

use async_trait::async_trait;
use finnews_core::{ScoringError, Summarizer, Summary};
use serde::{Deserialize, Serialize};

use crate::status_error;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

const SUMMARY_PROMPT: &str = "Summarize this financial news article in 2 sentences for a trader.\n\
Focus on stock impact, regulatory moves, risks, opportunities, and sentiment.\n\
Be concise, accurate, and trader-centric.";

pub struct GeminiSummarizer {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
}

impl GeminiSummarizer {
    #[must_use]
    pub fn new(api_key: &str, model: &str) -> Self {
        Self::with_base_url(api_key, model, DEFAULT_BASE_URL)
    }

    /// Point the client at a different host. Used by tests.
    #[must_use]
    pub fn with_base_url(api_key: &str, model: &str, base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

#[async_trait]
impl Summarizer for GeminiSummarizer {
    async fn summarize(&self, text: &str) -> Result<Summary, ScoringError> {
        if text.trim().is_empty() {
            return Err(ScoringError::Rejected("no text to summarize".to_string()));
        }

        let prompt = format!("{SUMMARY_PROMPT}\n\nArticle: {text}");
        let body = GenerateRequest {
            contents: [Content {
                parts: [Part { text: &prompt }],
            }],
        };

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| ScoringError::Unavailable(format!("Gemini request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(status_error("Gemini", response.status()));
        }

        let parsed: GenerateResponse = response.json().await.map_err(|e| {
            ScoringError::InvalidResponse(format!("Gemini response parse error: {e}"))
        })?;

        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ScoringError::InvalidResponse("Gemini returned no text".to_string()))?;

        let (input_tokens, output_tokens) = parsed
            .usage_metadata
            .map_or((0, 0), |u| (u.prompt_token_count, u.candidates_token_count));

        Ok(Summary {
            text,
            input_tokens,
            output_tokens,
        })
    }
}
