//! Entity extraction, impact derivation, and sentiment scoring for one run's
//! unique articles.

use std::collections::HashSet;
use std::sync::Arc;

use finnews_core::{
    Article, ArticleStore, EntityBundle, EntityClassifier, ImpactRecord, ImpactType,
    SentimentClassifier, SentimentScore, StoreError, Taxonomy,
};

/// An article moving through the enrichment stages.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedArticle {
    pub article: Article,
    pub entities: EntityBundle,
    /// `None` until the sentiment stage has run.
    pub sentiment: Option<SentimentScore>,
    pub summary: Option<String>,
}

impl EnrichedArticle {
    #[must_use]
    pub fn new(article: Article) -> Self {
        Self {
            article,
            entities: EntityBundle::default(),
            sentiment: None,
            summary: None,
        }
    }
}

/// Map extracted entities to tradable symbols via the taxonomy.
///
/// Companies map directly, regulators and sectors by proxy. Names without a
/// symbol are skipped, as are repeated `(symbol, type)` pairs.
#[must_use]
pub fn derive_impacts(taxonomy: &Taxonomy, entities: &EntityBundle) -> Vec<ImpactRecord> {
    let direct = entities
        .companies
        .iter()
        .filter_map(|c| taxonomy.company_symbol(c))
        .map(|s| (s, ImpactType::Direct));
    let regulator = entities
        .regulators
        .iter()
        .filter_map(|r| taxonomy.regulator_symbol(r))
        .map(|s| (s, ImpactType::Regulator));
    let sector = entities
        .sectors
        .iter()
        .filter_map(|s| taxonomy.sector_symbol(s))
        .map(|s| (s, ImpactType::Sector));

    let mut seen = HashSet::new();
    direct
        .chain(regulator)
        .chain(sector)
        .filter(|(symbol, kind)| seen.insert((*symbol, *kind)))
        .map(|(symbol, kind)| ImpactRecord {
            symbol: symbol.to_string(),
            confidence: kind.confidence(),
            impact_type: kind,
        })
        .collect()
}

pub struct EnrichmentStage {
    entities: Arc<dyn EntityClassifier>,
    sentiment: Arc<dyn SentimentClassifier>,
    taxonomy: Arc<Taxonomy>,
}

impl EnrichmentStage {
    #[must_use]
    pub fn new(
        entities: Arc<dyn EntityClassifier>,
        sentiment: Arc<dyn SentimentClassifier>,
        taxonomy: Arc<Taxonomy>,
    ) -> Self {
        Self {
            entities,
            sentiment,
            taxonomy,
        }
    }

    #[must_use]
    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    /// Classify entities for every article. A classifier failure leaves that
    /// article with an empty bundle.
    pub async fn extract_entities(&self, articles: Vec<Article>) -> Vec<EnrichedArticle> {
        let mut out = Vec::with_capacity(articles.len());
        for article in articles {
            let mut enriched = EnrichedArticle::new(article);
            let bundle = match self.entities.classify_entities(&enriched.article.text).await {
                Ok(bundle) => bundle.canonicalized(),
                Err(e) => {
                    tracing::warn!(
                        article_id = enriched.article.id,
                        error = %e,
                        "entity classification failed; continuing with no entities"
                    );
                    EntityBundle::default()
                }
            };
            enriched.entities = EntityBundle {
                impacts: derive_impacts(&self.taxonomy, &bundle),
                ..bundle
            };
            tracing::debug!(
                article_id = enriched.article.id,
                companies = enriched.entities.companies.len(),
                regulators = enriched.entities.regulators.len(),
                impacts = enriched.entities.impacts.len(),
                "entities extracted"
            );
            out.push(enriched);
        }
        out
    }

    /// Score sentiment for every article. Empty text and classifier failures
    /// both get the neutral fallback.
    pub async fn score_sentiment(&self, articles: &mut [EnrichedArticle]) {
        for enriched in articles.iter_mut() {
            let text = enriched.article.text.as_str();
            let score = if text.trim().is_empty() {
                SentimentScore::neutral_fallback()
            } else {
                match self.sentiment.classify_sentiment(text).await {
                    Ok(score) => score,
                    Err(e) => {
                        tracing::warn!(
                            article_id = enriched.article.id,
                            error = %e,
                            "sentiment classification failed; using neutral fallback"
                        );
                        SentimentScore::neutral_fallback()
                    }
                }
            };
            enriched.sentiment = Some(score);
        }
    }

    /// Persist entities and sentiment for every article.
    ///
    /// # Errors
    ///
    /// Returns the first [`StoreError`]; rows written before it stay written.
    pub async fn persist(
        store: &dyn ArticleStore,
        articles: &[EnrichedArticle],
    ) -> Result<(), StoreError> {
        for enriched in articles {
            let sentiment = enriched.sentiment.unwrap_or_default();
            store
                .save_enrichment(enriched.article.id, &enriched.entities, &sentiment)
                .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "enrichment_test.rs"]
mod tests;
