//! Conversion from raw feed entries to [`finnews_core::Article`].
//!
//! Ids and content hashes are derived here so that re-fetching the same
//! entry always produces the same values.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use finnews_core::Article;
use regex::Regex;
use sha2::{Digest, Sha256};

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));
static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

const ENTITIES: &[(&str, &str)] = &[
    ("&nbsp;", " "),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
    ("&apos;", "'"),
    // last, so "&amp;lt;" decodes to "&lt;" and not "<"
    ("&amp;", "&"),
];

/// The fields of a feed entry that normalization looks at.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawEntry {
    pub guid: Option<String>,
    pub link: Option<String>,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub published: Option<DateTime<Utc>>,
}

impl From<feed_rs::model::Entry> for RawEntry {
    fn from(entry: feed_rs::model::Entry) -> Self {
        let summary = entry
            .summary
            .map(|t| t.content)
            .or_else(|| entry.content.and_then(|c| c.body));
        Self {
            guid: Some(entry.id),
            link: entry.links.into_iter().next().map(|l| l.href),
            title: entry.title.map(|t| t.content),
            summary,
            published: entry.published.or(entry.updated),
        }
    }
}

/// Strip markup, decode the common HTML entities and collapse whitespace.
#[must_use]
pub fn clean_html(raw: &str) -> String {
    let stripped = TAG_RE.replace_all(raw, " ");
    let mut decoded = stripped.into_owned();
    for (entity, replacement) in ENTITIES {
        if decoded.contains(entity) {
            decoded = decoded.replace(entity, replacement);
        }
    }
    WHITESPACE_RE.replace_all(&decoded, " ").trim().to_string()
}

/// Lowercased title reduced to `[a-z0-9 ]` with single spaces.
#[must_use]
pub fn normalize_title(title: &str) -> String {
    let lowered: String = clean_html(title)
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() {
                c
            } else {
                ' '
            }
        })
        .collect();
    lowered.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lowercase hex SHA-256 of the normalized title.
#[must_use]
pub fn content_hash(title: &str) -> String {
    format!("{:x}", Sha256::digest(normalize_title(title).as_bytes()))
}

/// Stable article id: the first 60 bits of SHA-256 over source, guid and
/// publish time. Always non-negative.
#[must_use]
pub fn article_id(source: &str, guid: &str, published_at: DateTime<Utc>) -> i64 {
    let input = format!("{source}|{guid}|{}", published_at.to_rfc3339());
    let digest = Sha256::digest(input.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    let value = u64::from_be_bytes(prefix) >> 4;
    i64::try_from(value).unwrap_or_default()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Normalize one entry. Returns `None` when the entry has no usable title.
///
/// The guid falls back to the first link, then to the title itself; a
/// missing publish time falls back to `fetched_at`.
#[must_use]
pub fn normalize_entry(raw: RawEntry, source: &str, fetched_at: DateTime<Utc>) -> Option<Article> {
    let title = clean_html(&non_empty(raw.title)?);
    if normalize_title(&title).is_empty() {
        return None;
    }

    let guid = non_empty(raw.guid)
        .or_else(|| non_empty(raw.link))
        .unwrap_or_else(|| title.clone());
    let published_at = raw.published.unwrap_or(fetched_at);

    let summary = raw.summary.as_deref().map(clean_html).unwrap_or_default();
    let text = if summary.is_empty() || summary == title {
        title.clone()
    } else {
        format!("{title}. {summary}")
    };

    Some(Article {
        id: article_id(source, &guid, published_at),
        content_hash: content_hash(&title),
        title,
        text,
        source: source.to_string(),
        published_at,
        ingested_at: fetched_at,
    })
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
