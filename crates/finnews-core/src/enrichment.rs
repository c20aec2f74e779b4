use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// How an impact record was derived from the entity bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImpactType {
    Direct,
    Regulator,
    Sector,
}

impl ImpactType {
    /// Fixed confidence for each derivation path.
    #[must_use]
    pub fn confidence(self) -> f32 {
        match self {
            Self::Direct => 1.0,
            Self::Regulator => 0.8,
            Self::Sector => 0.6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactRecord {
    pub symbol: String,
    pub confidence: f32,
    #[serde(rename = "type")]
    pub impact_type: ImpactType,
}

/// Labels extracted from one article.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityBundle {
    #[serde(default)]
    pub companies: Vec<String>,
    #[serde(default)]
    pub sectors: Vec<String>,
    #[serde(default)]
    pub regulators: Vec<String>,
    #[serde(default)]
    pub people: Vec<String>,
    #[serde(default)]
    pub events: Vec<String>,
    #[serde(default)]
    pub impacts: Vec<ImpactRecord>,
}

impl EntityBundle {
    /// Drop empty entries and case-insensitive duplicates, keeping the first
    /// spelling seen in each list.
    #[must_use]
    pub fn canonicalized(mut self) -> Self {
        for list in [
            &mut self.companies,
            &mut self.sectors,
            &mut self.regulators,
            &mut self.people,
            &mut self.events,
        ] {
            dedup_case_insensitive(list);
        }
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.companies.is_empty()
            && self.sectors.is_empty()
            && self.regulators.is_empty()
            && self.people.is_empty()
            && self.events.is_empty()
    }
}

fn dedup_case_insensitive(list: &mut Vec<String>) {
    let mut seen: HashSet<String> = HashSet::new();
    list.retain_mut(|item| {
        let trimmed = item.trim().to_string();
        if trimmed.is_empty() {
            return false;
        }
        let key = trimmed.to_lowercase();
        *item = trimmed;
        seen.insert(key)
    });
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SentimentLabel::Positive => write!(f, "positive"),
            SentimentLabel::Negative => write!(f, "negative"),
            SentimentLabel::Neutral => write!(f, "neutral"),
        }
    }
}

impl std::str::FromStr for SentimentLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positive" => Ok(Self::Positive),
            "negative" => Ok(Self::Negative),
            "neutral" => Ok(Self::Neutral),
            other => Err(format!("unknown sentiment label '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentScore {
    pub label: SentimentLabel,
    /// Always within `[0.0, 1.0]`.
    pub confidence: f32,
}

impl SentimentScore {
    /// Build a score, clamping confidence into `[0.0, 1.0]`. NaN becomes `0.0`.
    #[must_use]
    pub fn new(label: SentimentLabel, confidence: f32) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Self { label, confidence }
    }

    /// The documented result for empty input or an unavailable scorer.
    #[must_use]
    pub fn neutral_fallback() -> Self {
        Self {
            label: SentimentLabel::Neutral,
            confidence: 0.0,
        }
    }
}

impl Default for SentimentScore {
    fn default() -> Self {
        Self::neutral_fallback()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalized_drops_case_insensitive_duplicates() {
        let bundle = EntityBundle {
            companies: vec![
                "HDFC Bank".to_string(),
                "hdfc bank".to_string(),
                " Infosys ".to_string(),
                String::new(),
            ],
            regulators: vec!["RBI".to_string(), "rbi".to_string()],
            ..EntityBundle::default()
        }
        .canonicalized();

        assert_eq!(bundle.companies, vec!["HDFC Bank", "Infosys"]);
        assert_eq!(bundle.regulators, vec!["RBI"]);
    }

    #[test]
    fn canonicalized_trims_before_comparing() {
        let bundle = EntityBundle {
            people: vec![
                "  Shaktikanta Das ".to_string(),
                "shaktikanta das".to_string(),
                "   ".to_string(),
            ],
            ..EntityBundle::default()
        }
        .canonicalized();

        assert_eq!(bundle.people, vec!["Shaktikanta Das"]);
    }

    #[test]
    fn sentiment_score_clamps_confidence() {
        assert_eq!(
            SentimentScore::new(SentimentLabel::Positive, 1.7).confidence,
            1.0
        );
        assert_eq!(
            SentimentScore::new(SentimentLabel::Negative, -0.2).confidence,
            0.0
        );
        assert_eq!(
            SentimentScore::new(SentimentLabel::Neutral, f32::NAN).confidence,
            0.0
        );
    }

    #[test]
    fn neutral_fallback_is_zero_confidence() {
        let s = SentimentScore::neutral_fallback();
        assert_eq!(s.label, SentimentLabel::Neutral);
        assert_eq!(s.confidence, 0.0);
    }

    #[test]
    fn impact_type_confidence_table() {
        assert_eq!(ImpactType::Direct.confidence(), 1.0);
        assert_eq!(ImpactType::Regulator.confidence(), 0.8);
        assert_eq!(ImpactType::Sector.confidence(), 0.6);
    }

    #[test]
    fn sentiment_label_parses_case_insensitively() {
        assert_eq!("POSITIVE".parse::<SentimentLabel>(), Ok(SentimentLabel::Positive));
        assert!("bullish".parse::<SentimentLabel>().is_err());
    }
}
