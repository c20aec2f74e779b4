//! Clients and local implementations for the scoring collaborators defined
//! in [`finnews_core::scoring`].

pub mod embeddings;
pub mod entities;
pub mod memory_index;
pub mod safety;
pub mod scorer;
pub mod summarizer;
pub mod vector_store;

pub use embeddings::TeiEmbedder;
pub use entities::KeywordEntityClassifier;
pub use memory_index::MemoryIndex;
pub use safety::SafetyGuard;
pub use scorer::{lexicon_score, LexiconSentiment};
pub use summarizer::GeminiSummarizer;
pub use vector_store::QdrantIndex;

/// Map a non-success HTTP status onto the scorer error taxonomy.
pub(crate) fn status_error(
    service: &str,
    status: reqwest::StatusCode,
) -> finnews_core::ScoringError {
    use finnews_core::ScoringError;

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        ScoringError::RateLimited(format!("{service} returned status {status}"))
    } else if status.is_server_error() {
        ScoringError::Unavailable(format!("{service} returned status {status}"))
    } else {
        ScoringError::Rejected(format!("{service} returned status {status}"))
    }
}
