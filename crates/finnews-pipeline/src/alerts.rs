//! Alert rules and the broadcast fan-out to subscribers.

use finnews_core::taxonomy::AlertKeywords;
use finnews_core::{Alert, AlertLevel, EntityBundle, SentimentLabel, SentimentScore};
use tokio::sync::broadcast;

/// Sentiment confidence that must be exceeded (strictly) to raise an alert.
pub const SENTIMENT_ALERT_THRESHOLD: f32 = 0.90;
const CHANNEL_CAPACITY: usize = 256;

/// Fans alerts out to every live subscriber. Slow subscribers lag and lose
/// the oldest alerts rather than blocking the pipeline.
#[derive(Debug, Clone)]
pub struct AlertBroadcaster {
    tx: broadcast::Sender<Alert>,
}

impl Default for AlertBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertBroadcaster {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Alert> {
        self.tx.subscribe()
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Send one alert. Returns how many subscribers received it; zero
    /// subscribers is not an error.
    pub fn publish(&self, alert: Alert) -> usize {
        tracing::info!(
            level = %alert.level,
            article_id = alert.article_id,
            headline = %alert.headline,
            "alert raised"
        );
        self.tx.send(alert).unwrap_or(0)
    }
}

/// `HIGH_RISK` for confident negative sentiment, `BULLISH` for confident positive.
#[must_use]
pub fn sentiment_alert(
    article_id: i64,
    text: &str,
    sentiment: &SentimentScore,
    entities: &EntityBundle,
) -> Option<Alert> {
    if sentiment.confidence <= SENTIMENT_ALERT_THRESHOLD {
        return None;
    }
    let level = match sentiment.label {
        SentimentLabel::Negative => AlertLevel::HighRisk,
        SentimentLabel::Positive => AlertLevel::Bullish,
        SentimentLabel::Neutral => return None,
    };
    Some(Alert::new(
        level,
        article_id,
        text,
        Some(sentiment.label),
        entities,
        None,
    ))
}

/// Keyword alerts for a generated summary: at most one `REGULATORY_UPDATE`
/// and one `EARNINGS_UPDATE`, in that order.
#[must_use]
pub fn summary_alerts(
    article_id: i64,
    text: &str,
    summary: &str,
    sentiment: Option<SentimentLabel>,
    entities: &EntityBundle,
    keywords: &AlertKeywords,
) -> Vec<Alert> {
    let lowered = summary.to_lowercase();
    let hit = |list: &[String]| list.iter().any(|k| lowered.contains(k.as_str()));

    [
        (AlertLevel::RegulatoryUpdate, hit(&keywords.regulatory)),
        (AlertLevel::EarningsUpdate, hit(&keywords.earnings)),
    ]
    .into_iter()
    .filter(|(_, matched)| *matched)
    .map(|(level, _)| Alert::new(level, article_id, text, sentiment, entities, Some(summary)))
    .collect()
}
