//! Taxonomy-driven keyword entity classifier.

use std::sync::Arc;

use async_trait::async_trait;
use finnews_core::{ConfigError, EntityBundle, EntityClassifier, ScoringError, Taxonomy};
use regex::Regex;

/// One taxonomy label and the pattern that detects it.
struct Matcher {
    label: String,
    pattern: Regex,
}

impl Matcher {
    /// Case-insensitive match on any of `terms`, bounded by non-alphanumerics
    /// so "sbi" does not fire inside "sbicard" and "m&m" still matches.
    fn new(label: &str, terms: &[String]) -> Result<Option<Self>, ConfigError> {
        let alternatives: Vec<String> = terms
            .iter()
            .filter(|t| !t.is_empty())
            .map(|t| regex::escape(t))
            .collect();
        if alternatives.is_empty() {
            return Ok(None);
        }
        let pattern = Regex::new(&format!(
            r"(?i)(?:^|[^\p{{Alphabetic}}\p{{N}}])(?:{})(?:$|[^\p{{Alphabetic}}\p{{N}}])",
            alternatives.join("|")
        ))
        .map_err(|e| ConfigError::Validation(format!("pattern for '{label}': {e}")))?;
        Ok(Some(Self {
            label: label.to_string(),
            pattern,
        }))
    }

    fn matches(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }
}

fn build(
    entries: impl Iterator<Item = (String, Vec<String>)>,
) -> Result<Vec<Matcher>, ConfigError> {
    let mut out = Vec::new();
    for (label, terms) in entries {
        if let Some(m) = Matcher::new(&label, &terms)? {
            out.push(m);
        }
    }
    Ok(out)
}

/// Offline [`EntityClassifier`] that matches company names and aliases,
/// sector keywords, regulator aliases and event keywords from a [`Taxonomy`].
///
/// A company hit also adds the company's sector. `people` is never filled.
pub struct KeywordEntityClassifier {
    taxonomy: Arc<Taxonomy>,
    companies: Vec<Matcher>,
    sectors: Vec<Matcher>,
    regulators: Vec<Matcher>,
    events: Vec<Matcher>,
}

impl KeywordEntityClassifier {
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if a taxonomy term cannot be
    /// compiled into a pattern.
    pub fn new(taxonomy: Arc<Taxonomy>) -> Result<Self, ConfigError> {
        let companies = build(
            taxonomy
                .companies
                .iter()
                .map(|c| (c.name.clone(), c.aliases.clone())),
        )?;
        let sectors = build(
            taxonomy
                .sectors
                .iter()
                .map(|s| (s.name.clone(), s.keywords.clone())),
        )?;
        let regulators = build(
            taxonomy
                .regulators
                .iter()
                .map(|r| (r.name.clone(), r.aliases.clone())),
        )?;
        let events = build(taxonomy.events.iter().map(|e| (e.clone(), vec![e.clone()])))?;

        Ok(Self {
            taxonomy,
            companies,
            sectors,
            regulators,
            events,
        })
    }

    #[must_use]
    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    /// Synchronous core of [`EntityClassifier::classify_entities`].
    #[must_use]
    pub fn classify(&self, text: &str) -> EntityBundle {
        let mut bundle = EntityBundle::default();
        if text.trim().is_empty() {
            return bundle;
        }

        for m in self.companies.iter().filter(|m| m.matches(text)) {
            bundle.companies.push(m.label.clone());
            if let Some(sector) = self
                .taxonomy
                .company(&m.label)
                .and_then(|c| c.sector.clone())
            {
                bundle.sectors.push(sector);
            }
        }
        bundle.sectors.extend(
            self.sectors
                .iter()
                .filter(|m| m.matches(text))
                .map(|m| m.label.clone()),
        );
        bundle.regulators = self
            .regulators
            .iter()
            .filter(|m| m.matches(text))
            .map(|m| m.label.clone())
            .collect();
        bundle.events = self
            .events
            .iter()
            .filter(|m| m.matches(text))
            .map(|m| m.label.clone())
            .collect();

        bundle.canonicalized()
    }
}

#[async_trait]
impl EntityClassifier for KeywordEntityClassifier {
    async fn classify_entities(&self, text: &str) -> Result<EntityBundle, ScoringError> {
        Ok(self.classify(text))
    }
}

#[cfg(test)]
mod tests {
    use finnews_core::taxonomy::parse_taxonomy;

    use super::*;

    const YAML: &str = r"
sectors:
  - name: Banking
    keywords: [bank, banking, lender]
    symbol: BANKNIFTY
  - name: Auto
    keywords: [automobile, carmaker]
    symbol: NIFTYAUTO
companies:
  - name: HDFC Bank
    aliases: [hdfc]
    sector: Banking
    symbol: HDFCBANK
  - name: Mahindra & Mahindra
    aliases: [m&m]
    sector: Auto
    symbol: M&M
  - name: SBI
    aliases: [state bank of india]
    sector: Banking
    symbol: SBIN
regulators:
  - name: RBI
    aliases: [reserve bank of india, reserve bank]
    symbol: BANKNIFTY
events: [merger, rate hike]
";

    fn classifier() -> KeywordEntityClassifier {
        let taxonomy = parse_taxonomy(YAML).unwrap();
        KeywordEntityClassifier::new(Arc::new(taxonomy)).unwrap()
    }

    #[test]
    fn company_alias_matches_and_adds_sector() {
        let bundle = classifier().classify("hdfc reports strong quarter");
        assert_eq!(bundle.companies, vec!["HDFC Bank"]);
        assert_eq!(bundle.sectors, vec!["Banking"]);
    }

    #[test]
    fn regulator_alias_is_case_insensitive() {
        let bundle = classifier().classify("The Reserve Bank of India held rates");
        assert_eq!(bundle.regulators, vec!["RBI"]);
    }

    #[test]
    fn terms_do_not_match_inside_words() {
        let bundle = classifier().classify("sbicard shares trade flat");
        assert!(bundle.companies.is_empty());
    }

    #[test]
    fn symbols_in_terms_are_escaped() {
        let bundle = classifier().classify("M&M launches new SUV");
        assert_eq!(bundle.companies, vec!["Mahindra & Mahindra"]);
    }

    #[test]
    fn multi_word_events_match() {
        let bundle = classifier().classify("Surprise rate hike by RBI; merger talks stall");
        assert_eq!(bundle.events, vec!["merger", "rate hike"]);
        assert!(bundle.people.is_empty());
    }

    #[test]
    fn sectors_are_deduplicated() {
        let bundle = classifier().classify("HDFC Bank and SBI lead banking rally");
        assert_eq!(bundle.companies, vec!["HDFC Bank", "SBI"]);
        assert_eq!(bundle.sectors, vec!["Banking"]);
    }

    #[tokio::test]
    async fn empty_text_yields_empty_bundle() {
        let bundle = classifier().classify_entities("").await.unwrap();
        assert!(bundle.is_empty());
    }
}
