use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Pipeline run states, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStage {
    Ingested,
    Deduped,
    EntitiesExtracted,
    SentimentScored,
    Summarized,
    Indexed,
    Done,
}

impl RunStage {
    /// Whether a failure in this stage aborts the run.
    #[must_use]
    pub fn is_required(self) -> bool {
        !matches!(self, Self::Summarized)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ingested => "INGESTED",
            Self::Deduped => "DEDUPED",
            Self::EntitiesExtracted => "ENTITIES_EXTRACTED",
            Self::SentimentScored => "SENTIMENT_SCORED",
            Self::Summarized => "SUMMARIZED",
            Self::Indexed => "INDEXED",
            Self::Done => "DONE",
        }
    }
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counters for one pipeline run. Owned by the orchestrator; callers get copies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub fetched: usize,
    pub new: usize,
    pub unique: usize,
    pub clusters: usize,
    pub summarized: usize,
    pub indexed: usize,
    pub alerts_sent: usize,
    /// Last stage that completed. `None` until ingestion succeeds.
    pub last_stage: Option<RunStage>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunStats {
    #[must_use]
    pub fn started(fetched: usize) -> Self {
        Self {
            fetched,
            new: 0,
            unique: 0,
            clusters: 0,
            summarized: 0,
            indexed: 0,
            alerts_sent: 0,
            last_stage: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }
}
