//! Entity taxonomy: the keyword tables and symbol map used for entity
//! classification, impact derivation, and alert keyword matching.
//!
//! Loaded from YAML so the tables can change without a rebuild.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyEntry {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub sector: Option<String>,
    pub symbol: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorEntry {
    pub name: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub symbol: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegulatorEntry {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub symbol: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertKeywords {
    #[serde(default = "default_regulatory_keywords")]
    pub regulatory: Vec<String>,
    #[serde(default = "default_earnings_keywords")]
    pub earnings: Vec<String>,
}

impl Default for AlertKeywords {
    fn default() -> Self {
        Self {
            regulatory: default_regulatory_keywords(),
            earnings: default_earnings_keywords(),
        }
    }
}

fn default_regulatory_keywords() -> Vec<String> {
    ["repo", "inflation", "rbi", "reserve bank", "monetary policy"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_earnings_keywords() -> Vec<String> {
    ["profit", "growth", "earnings", "revenue", "dividend"]
        .into_iter()
        .map(String::from)
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Taxonomy {
    #[serde(default)]
    pub companies: Vec<CompanyEntry>,
    #[serde(default)]
    pub sectors: Vec<SectorEntry>,
    #[serde(default)]
    pub regulators: Vec<RegulatorEntry>,
    #[serde(default)]
    pub events: Vec<String>,
    #[serde(default)]
    pub alert_keywords: AlertKeywords,
}

impl Taxonomy {
    #[must_use]
    pub fn company(&self, name: &str) -> Option<&CompanyEntry> {
        self.companies
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    #[must_use]
    pub fn sector(&self, name: &str) -> Option<&SectorEntry> {
        self.sectors.iter().find(|s| s.name.eq_ignore_ascii_case(name))
    }

    #[must_use]
    pub fn regulator(&self, name: &str) -> Option<&RegulatorEntry> {
        self.regulators
            .iter()
            .find(|r| r.name.eq_ignore_ascii_case(name))
    }

    #[must_use]
    pub fn company_symbol(&self, name: &str) -> Option<&str> {
        self.company(name).and_then(|c| c.symbol.as_deref())
    }

    #[must_use]
    pub fn regulator_symbol(&self, name: &str) -> Option<&str> {
        self.regulator(name).and_then(|r| r.symbol.as_deref())
    }

    #[must_use]
    pub fn sector_symbol(&self, name: &str) -> Option<&str> {
        self.sector(name).and_then(|s| s.symbol.as_deref())
    }

    /// Lowercase and trim every alias/keyword, and make each name its own alias.
    fn normalize(&mut self) {
        fn norm(list: &mut Vec<String>, name: &str) {
            list.push(name.to_string());
            for item in list.iter_mut() {
                *item = item.trim().to_lowercase();
            }
            list.retain(|s| !s.is_empty());
            let mut seen = HashSet::new();
            list.retain(|s| seen.insert(s.clone()));
        }

        for c in &mut self.companies {
            norm(&mut c.aliases, &c.name);
        }
        for s in &mut self.sectors {
            norm(&mut s.keywords, &s.name);
        }
        for r in &mut self.regulators {
            norm(&mut r.aliases, &r.name);
        }
        for list in [
            &mut self.events,
            &mut self.alert_keywords.regulatory,
            &mut self.alert_keywords.earnings,
        ] {
            for item in list.iter_mut() {
                *item = item.trim().to_lowercase();
            }
            list.retain(|s| !s.is_empty());
        }
    }
}

/// Load and validate the taxonomy from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_taxonomy(path: &Path) -> Result<Taxonomy, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::TaxonomyFileIo {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_taxonomy(&content)
}

/// Parse and validate taxonomy YAML already in memory.
///
/// # Errors
///
/// Returns `ConfigError` if the YAML is malformed or fails validation.
pub fn parse_taxonomy(yaml: &str) -> Result<Taxonomy, ConfigError> {
    let mut taxonomy: Taxonomy = serde_yaml::from_str(yaml)?;
    validate_taxonomy(&taxonomy)?;
    taxonomy.normalize();
    Ok(taxonomy)
}

fn validate_taxonomy(taxonomy: &Taxonomy) -> Result<(), ConfigError> {
    check_names("company", taxonomy.companies.iter().map(|c| c.name.as_str()))?;
    check_names("sector", taxonomy.sectors.iter().map(|s| s.name.as_str()))?;
    check_names(
        "regulator",
        taxonomy.regulators.iter().map(|r| r.name.as_str()),
    )?;

    for company in &taxonomy.companies {
        if let Some(sector) = &company.sector {
            if taxonomy.sector(sector).is_none() {
                return Err(ConfigError::Validation(format!(
                    "company '{}' references unknown sector '{sector}'",
                    company.name
                )));
            }
        }
    }

    Ok(())
}

fn check_names<'a>(kind: &str, names: impl Iterator<Item = &'a str>) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for name in names {
        if name.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "{kind} name must be non-empty"
            )));
        }
        if !seen.insert(name.trim().to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate {kind} name: '{name}'"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "taxonomy_test.rs"]
mod tests;
