//! Post-filter for generated summaries.

use finnews_core::ScoringError;

const BANNED_PHRASES: &[&str] = &[
    "guaranteed returns",
    "sure profit",
    "risk-free investment",
    "buy now",
    "sell now",
    "certain gain",
    "no risk",
    "100% profit",
    "guaranteed profit",
    "can't lose",
    "definite returns",
];

/// Rejects summaries that read as investment advice.
#[derive(Debug, Clone)]
pub struct SafetyGuard {
    banned: Vec<String>,
}

impl Default for SafetyGuard {
    fn default() -> Self {
        Self {
            banned: BANNED_PHRASES.iter().map(|p| (*p).to_string()).collect(),
        }
    }
}

impl SafetyGuard {
    /// Collapse whitespace, then reject empty output or any banned phrase
    /// (case-insensitive).
    ///
    /// # Errors
    ///
    /// - [`ScoringError::InvalidResponse`] for an empty summary.
    /// - [`ScoringError::Rejected`] when a banned phrase is present.
    pub fn check(&self, summary: &str) -> Result<String, ScoringError> {
        let cleaned = summary.split_whitespace().collect::<Vec<_>>().join(" ");
        if cleaned.is_empty() {
            return Err(ScoringError::InvalidResponse("empty summary".to_string()));
        }

        let lowered = cleaned.to_lowercase();
        if let Some(phrase) = self.banned.iter().find(|p| lowered.contains(p.as_str())) {
            return Err(ScoringError::Rejected(format!(
                "summary contains banned phrase '{phrase}'"
            )));
        }
        Ok(cleaned)
    }
}
