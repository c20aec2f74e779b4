//! Integration tests for `FeedFetcher` against local `wiremock` servers.

use std::time::Duration;

use chrono::Utc;
use finnews_feeds::{FeedError, FeedFetcher, FetcherConfig};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_fetcher(timeout_secs: u64) -> FeedFetcher {
    FeedFetcher::new(FetcherConfig {
        timeout_secs,
        user_agent: "finnews-test/0.1".to_string(),
        max_concurrent: 4,
        max_age_hours: 24 * 365 * 50,
    })
    .expect("failed to build test FeedFetcher")
}

fn rss(items: &[(&str, &str)]) -> String {
    let body: String = items
        .iter()
        .map(|(guid, title)| {
            format!(
                "<item><guid>{guid}</guid><title>{title}</title>\
                 <link>https://news.example/{guid}</link>\
                 <description>&lt;p&gt;Details for {title}&lt;/p&gt;</description>\
                 <pubDate>Mon, 02 Jun 2025 08:00:00 +0000</pubDate></item>"
            )
        })
        .collect();
    format!(
        "<?xml version=\"1.0\"?><rss version=\"2.0\"><channel>\
         <title>Test</title><link>https://news.example</link><description>t</description>\
         {body}</channel></rss>"
    )
}

async fn mount_feed(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route.to_string()))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/rss+xml")
                .set_body_string(body),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn fetch_normalizes_entries_from_one_feed() {
    let server = MockServer::start().await;
    mount_feed(&server, "/a.xml", rss(&[("1", "RBI hikes repo rate")])).await;

    let url = format!("{}/a.xml", server.uri());
    let articles = test_fetcher(5).fetch(&[url.clone()]).await;

    assert_eq!(articles.len(), 1);
    assert_eq!(articles[0].title, "RBI hikes repo rate");
    assert_eq!(articles[0].source, url);
    assert!(articles[0].text.starts_with("RBI hikes repo rate. "));
}

#[tokio::test]
async fn failing_source_does_not_abort_fetch() {
    let server = MockServer::start().await;
    mount_feed(&server, "/good.xml", rss(&[("1", "Sensex gains 300 points")])).await;
    Mock::given(method("GET"))
        .and(path("/down.xml"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/garbage.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string("this is not a feed"))
        .mount(&server)
        .await;

    let sources = vec![
        format!("{}/down.xml", server.uri()),
        format!("{}/good.xml", server.uri()),
        format!("{}/garbage.xml", server.uri()),
    ];
    let articles = test_fetcher(5).fetch(&sources).await;

    assert_eq!(articles.len(), 1);
    assert_eq!(articles[0].title, "Sensex gains 300 points");
}

#[tokio::test]
async fn same_story_across_feeds_is_returned_once() {
    let server = MockServer::start().await;
    mount_feed(&server, "/a.xml", rss(&[("1", "TCS beats estimates")])).await;
    mount_feed(
        &server,
        "/b.xml",
        rss(&[("77", "TCS beats estimates!"), ("78", "Infosys guidance cut")]),
    )
    .await;

    let sources = vec![
        format!("{}/a.xml", server.uri()),
        format!("{}/b.xml", server.uri()),
    ];
    let articles = test_fetcher(5).fetch(&sources).await;

    let titles: Vec<&str> = articles.iter().map(|a| a.title.as_str()).collect();
    assert_eq!(titles, vec!["TCS beats estimates", "Infosys guidance cut"]);
}

#[tokio::test]
async fn refetching_yields_identical_ids() {
    let server = MockServer::start().await;
    mount_feed(&server, "/a.xml", rss(&[("1", "Nifty hits record")])).await;
    let sources = vec![format!("{}/a.xml", server.uri())];

    let fetcher = test_fetcher(5);
    let first = fetcher.fetch(&sources).await;
    let second = fetcher.fetch(&sources).await;

    assert_eq!(first[0].id, second[0].id);
    assert_eq!(first[0].content_hash, second[0].content_hash);
}

#[tokio::test]
async fn stale_entries_are_filtered_by_max_age() {
    let server = MockServer::start().await;
    mount_feed(&server, "/a.xml", rss(&[("1", "Old news from 2025")])).await;

    let fetcher = FeedFetcher::new(FetcherConfig {
        max_age_hours: 1,
        ..FetcherConfig::default()
    })
    .unwrap();
    let articles = fetcher.fetch(&[format!("{}/a.xml", server.uri())]).await;
    assert!(articles.is_empty());
}

#[tokio::test]
async fn fetch_source_reports_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow.xml"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(rss(&[("1", "late")]))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let result = test_fetcher(1)
        .fetch_source(&format!("{}/slow.xml", server.uri()), Utc::now())
        .await;
    assert!(
        matches!(result, Err(FeedError::Timeout { timeout_secs: 1, .. })),
        "expected Timeout, got: {result:?}"
    );
}

#[tokio::test]
async fn fetch_source_reports_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing.xml"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let result = test_fetcher(5)
        .fetch_source(&format!("{}/missing.xml", server.uri()), Utc::now())
        .await;
    assert!(matches!(result, Err(FeedError::UnexpectedStatus { status: 404, .. })));
}
