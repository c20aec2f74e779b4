//! Financial-news lexicon scorer.

use async_trait::async_trait;
use finnews_core::{ScoringError, SentimentClassifier, SentimentLabel, SentimentScore};

/// Scores with a smaller magnitude than this are neutral.
const NEUTRAL_BAND: f32 = 0.05;

/// Word weights for market news.
///
/// Keys are lowercase single words. Values in `(0.0, 1.0]` are positive,
/// in `[-1.0, 0.0)` are negative. The final score is clamped to `[-1.0, 1.0]`.
pub(crate) const LEXICON: &[(&str, f32)] = &[
    // Positive signals
    ("gain", 0.3),
    ("gains", 0.3),
    ("rise", 0.3),
    ("rises", 0.3),
    ("rose", 0.3),
    ("surge", 0.5),
    ("surges", 0.5),
    ("surged", 0.5),
    ("jump", 0.4),
    ("jumps", 0.4),
    ("rally", 0.5),
    ("rallies", 0.5),
    ("soar", 0.5),
    ("soars", 0.5),
    ("profit", 0.3),
    ("growth", 0.3),
    ("beat", 0.4),
    ("beats", 0.4),
    ("record", 0.3),
    ("upgrade", 0.5),
    ("upgraded", 0.5),
    ("bullish", 0.6),
    ("strong", 0.3),
    ("boost", 0.4),
    ("boosts", 0.4),
    ("outperform", 0.5),
    ("dividend", 0.3),
    ("recovery", 0.4),
    ("approval", 0.4),
    ("approved", 0.4),
    // Negative signals
    ("loss", -0.4),
    ("losses", -0.4),
    ("fall", -0.3),
    ("falls", -0.3),
    ("fell", -0.3),
    ("drop", -0.3),
    ("drops", -0.3),
    ("decline", -0.3),
    ("declines", -0.3),
    ("plunge", -0.6),
    ("plunges", -0.6),
    ("crash", -0.7),
    ("slump", -0.5),
    ("selloff", -0.5),
    ("downgrade", -0.5),
    ("downgraded", -0.5),
    ("bearish", -0.6),
    ("weak", -0.3),
    ("miss", -0.4),
    ("misses", -0.4),
    ("default", -0.6),
    ("fraud", -0.8),
    ("probe", -0.4),
    ("penalty", -0.5),
    ("lawsuit", -0.5),
    ("layoffs", -0.5),
    ("warning", -0.4),
    ("concern", -0.3),
    ("concerns", -0.3),
    ("risk", -0.2),
    ("inflation", -0.2),
];

/// Score a text string using the lexicon.
///
/// Splits text into lowercase words, sums matching weights, and clamps
/// the result to `[-1.0, 1.0]`. Returns `0.0` for empty or unknown text.
#[must_use]
pub fn lexicon_score(text: &str) -> f32 {
    let mut score = 0.0_f32;
    for word in text.split_whitespace() {
        let w = word
            .trim_matches(|c: char| !c.is_alphabetic())
            .to_lowercase();
        if let Some(&(_, weight)) = LEXICON.iter().find(|(lex_word, _)| *lex_word == w) {
            score += weight;
        }
    }
    score.clamp(-1.0, 1.0)
}

/// Turn a clamped lexicon score into a labelled score.
#[must_use]
pub fn score_to_sentiment(score: f32) -> SentimentScore {
    let magnitude = score.abs();
    if magnitude < NEUTRAL_BAND {
        SentimentScore::new(SentimentLabel::Neutral, 1.0 - magnitude)
    } else if score > 0.0 {
        SentimentScore::new(SentimentLabel::Positive, 0.5 + magnitude / 2.0)
    } else {
        SentimentScore::new(SentimentLabel::Negative, 0.5 + magnitude / 2.0)
    }
}

/// Offline [`SentimentClassifier`] backed by [`lexicon_score`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LexiconSentiment;

#[async_trait]
impl SentimentClassifier for LexiconSentiment {
    async fn classify_sentiment(&self, text: &str) -> Result<SentimentScore, ScoringError> {
        if text.trim().is_empty() {
            return Ok(SentimentScore::neutral_fallback());
        }
        Ok(score_to_sentiment(lexicon_score(text)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_returns_zero() {
        assert_eq!(lexicon_score(""), 0.0);
    }

    #[test]
    fn unknown_text_returns_zero() {
        assert_eq!(lexicon_score("the quick brown fox"), 0.0);
    }

    #[test]
    fn punctuation_is_ignored() {
        assert!(lexicon_score("Shares surge!") > 0.0);
        assert!(lexicon_score("\"Fraud\", says regulator") < 0.0);
    }

    #[test]
    fn score_clamps_to_negative_one() {
        let score = lexicon_score("fraud crash plunge default bearish");
        assert_eq!(score, -1.0);
    }

    #[test]
    fn strong_positive_text_maps_to_high_confidence() {
        let sentiment = score_to_sentiment(lexicon_score(
            "stocks rally as profit beats estimates and surge continues record growth",
        ));
        assert_eq!(sentiment.label, SentimentLabel::Positive);
        assert!(sentiment.confidence > 0.9);
    }

    #[test]
    fn small_scores_are_neutral() {
        let sentiment = score_to_sentiment(0.02);
        assert_eq!(sentiment.label, SentimentLabel::Neutral);
        assert!((sentiment.confidence - 0.98).abs() < 1e-6);
    }

    #[test]
    fn confidence_stays_in_unit_interval() {
        for score in [-1.0, -0.5, -0.05, 0.0, 0.05, 0.5, 1.0] {
            let s = score_to_sentiment(score);
            assert!((0.0..=1.0).contains(&s.confidence));
        }
    }

    #[tokio::test]
    async fn blank_text_falls_back_to_neutral_zero() {
        let score = LexiconSentiment.classify_sentiment("   ").await.unwrap();
        assert_eq!(score, SentimentScore::neutral_fallback());
        assert_eq!(score.confidence, 0.0);
    }

    #[tokio::test]
    async fn negative_headline_is_negative() {
        let score = LexiconSentiment
            .classify_sentiment("Bank shares plunge after fraud probe")
            .await
            .unwrap();
        assert_eq!(score.label, SentimentLabel::Negative);
    }
}
