use chrono::TimeZone;

use super::*;

fn fetched_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 2, 9, 30, 0).unwrap()
}

fn entry(title: &str) -> RawEntry {
    RawEntry {
        guid: Some("guid-1".to_owned()),
        link: Some("https://example.com/a".to_owned()),
        title: Some(title.to_owned()),
        summary: Some("<p>The central bank raised rates.</p>".to_owned()),
        published: Some(Utc.with_ymd_and_hms(2025, 6, 2, 8, 0, 0).unwrap()),
    }
}

// -----------------------------------------------------------------------
// clean_html / normalize_title
// -----------------------------------------------------------------------

#[test]
fn clean_html_strips_tags_and_collapses_whitespace() {
    assert_eq!(
        clean_html("<p>RBI  <b>hikes</b>\n repo&nbsp;rate</p>"),
        "RBI hikes repo rate"
    );
}

#[test]
fn clean_html_decodes_entities_once() {
    assert_eq!(clean_html("M&amp;M &lt;up&gt;"), "M&M <up>");
    assert_eq!(clean_html("&amp;lt;"), "&lt;");
}

#[test]
fn normalize_title_drops_punctuation_and_case() {
    assert_eq!(
        normalize_title("HDFC Bank: Profit up 20%!"),
        "hdfc bank profit up 20"
    );
}

#[test]
fn titles_differing_only_in_markup_share_a_hash() {
    assert_eq!(
        content_hash("<b>TCS</b> beats  estimates"),
        content_hash("TCS beats estimates.")
    );
    assert_ne!(content_hash("TCS beats estimates"), content_hash("TCS misses estimates"));
}

#[test]
fn content_hash_is_lowercase_hex_sha256() {
    let hash = content_hash("anything");
    assert_eq!(hash.len(), 64);
    assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
}

// -----------------------------------------------------------------------
// article_id
// -----------------------------------------------------------------------

#[test]
fn article_id_is_stable_and_non_negative() {
    let at = fetched_at();
    let a = article_id("https://feed", "guid", at);
    let b = article_id("https://feed", "guid", at);
    assert_eq!(a, b);
    assert!(a >= 0);
    assert!(a < (1_i64 << 60));
}

#[test]
fn article_id_depends_on_every_component() {
    let at = fetched_at();
    let base = article_id("https://feed", "guid", at);
    assert_ne!(base, article_id("https://other", "guid", at));
    assert_ne!(base, article_id("https://feed", "guid-2", at));
    assert_ne!(
        base,
        article_id("https://feed", "guid", at + chrono::Duration::seconds(1))
    );
}

// -----------------------------------------------------------------------
// normalize_entry
// -----------------------------------------------------------------------

#[test]
fn normalize_entry_builds_text_from_title_and_summary() {
    let article =
        normalize_entry(entry("RBI hikes repo rate"), "https://feed", fetched_at()).unwrap();
    assert_eq!(article.title, "RBI hikes repo rate");
    assert_eq!(article.text, "RBI hikes repo rate. The central bank raised rates.");
    assert_eq!(article.source, "https://feed");
    assert_eq!(article.ingested_at, fetched_at());
}

#[test]
fn normalize_entry_rejects_missing_or_empty_title() {
    let mut raw = entry("x");
    raw.title = None;
    assert!(normalize_entry(raw, "https://feed", fetched_at()).is_none());

    let raw = entry("   ");
    assert!(normalize_entry(raw, "https://feed", fetched_at()).is_none());

    let raw = entry("<br/> !!! ");
    assert!(normalize_entry(raw, "https://feed", fetched_at()).is_none());
}

#[test]
fn normalize_entry_falls_back_to_link_then_title_for_guid() {
    let mut with_link = entry("Sensex closes higher");
    with_link.guid = Some(String::new());
    let a = normalize_entry(with_link.clone(), "https://feed", fetched_at()).unwrap();
    let published = with_link.published.unwrap();
    assert_eq!(a.id, article_id("https://feed", "https://example.com/a", published));

    let mut bare = with_link;
    bare.link = None;
    let b = normalize_entry(bare, "https://feed", fetched_at()).unwrap();
    assert_eq!(b.id, article_id("https://feed", "Sensex closes higher", published));
}

#[test]
fn normalize_entry_uses_fetch_time_when_unpublished() {
    let mut raw = entry("Nifty flat");
    raw.published = None;
    let article = normalize_entry(raw, "https://feed", fetched_at()).unwrap();
    assert_eq!(article.published_at, fetched_at());
}

#[test]
fn summary_equal_to_title_is_not_repeated() {
    let mut raw = entry("Nifty flat");
    raw.summary = Some("Nifty flat".to_owned());
    let article = normalize_entry(raw, "https://feed", fetched_at()).unwrap();
    assert_eq!(article.text, "Nifty flat");
}
