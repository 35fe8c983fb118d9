//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and run the
//! fetch, extract, and paginate cycle end-to-end.

use gleaner::crawler::{Coordinator, FetchError, HttpFetcher, RateLimiter, StopReason};
use gleaner::output::write_jsonl;
use gleaner::schema::{ExtractionSchema, FieldSpec, PaginationSpec};
use gleaner::storage::{SqliteStateStore, StateStore};
use gleaner::{GleanError, RobotsPolicy};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a fetcher with a fast limiter and near-instant retries
fn create_test_fetcher() -> HttpFetcher {
    let limiter = Arc::new(RateLimiter::new(50.0, 5));
    let robots = Arc::new(RobotsPolicy::new("gleaner").expect("robots client"));
    HttpFetcher::new(limiter, robots)
        .expect("http client")
        .with_backoff_scale(0.01)
}

fn create_test_schema() -> Arc<ExtractionSchema> {
    Arc::new(
        ExtractionSchema::new("products", "div.product")
            .with_field("id", FieldSpec::attr("a.name", "data-sku").required())
            .with_field("name", FieldSpec::text("a.name").required())
            .with_field("price", FieldSpec::text(".price").with_default("n/a"))
            .with_field("tags", FieldSpec::text("span.tag").multiple())
            .with_pagination(PaginationSpec {
                next_selector: "a[rel=next]".to_string(),
                max_pages: None,
                wait_seconds: None,
            }),
    )
}

fn product_page(products: &[(&str, &str)], next: Option<&str>) -> String {
    let body: String = products
        .iter()
        .map(|(sku, name)| {
            format!(
                r#"<div class="product"><a class="name" data-sku="{sku}" href="/p/{sku}">{name}</a>
                   <span class="price">$1</span><span class="tag">new</span></div>"#
            )
        })
        .collect();
    let next = next
        .map(|href| format!(r#"<a rel="next" href="{}">Next</a>"#, href))
        .unwrap_or_default();
    format!("<html><body>{}{}</body></html>", body, next)
}

async fn mount_robots(server: &MockServer, body: &str) {
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

async fn mount_page(server: &MockServer, page: &str, html: String, hits: u64) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(ResponseTemplate::new(200).set_body_string(html))
        .expect(hits)
        .mount(server)
        .await;
}

fn open_store(dir: &tempfile::TempDir) -> Arc<Mutex<SqliteStateStore>> {
    let store = SqliteStateStore::new(&dir.path().join("cache").join("state.sqlite"))
        .expect("state store");
    Arc::new(Mutex::new(store))
}

#[tokio::test]
async fn test_paginated_crawl_end_to_end() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nAllow: /").await;
    mount_page(&server, "/list/1", product_page(&[("a1", "Anvil"), ("b2", "Bolt")], Some("/list/2")), 1).await;
    mount_page(&server, "/list/2", product_page(&[("c3", "Chain")], Some("3")), 1).await;
    mount_page(&server, "/list/3", product_page(&[("d4", "Drill")], None), 1).await;

    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let mut coordinator = Coordinator::new(create_test_fetcher(), create_test_schema())
        .with_job("products", Arc::clone(&store));

    let records = coordinator
        .fetch_with_pagination(&format!("{}/list/1", server.uri()), None, true)
        .await
        .unwrap();

    assert_eq!(records.len(), 4);
    assert_eq!(records[0].get("name").unwrap(), "Anvil");
    assert_eq!(records[0].get("tags").unwrap(), &serde_json::json!(["new"]));
    assert_eq!(records[3].meta.as_ref().unwrap().page, Some(3));

    let stats = coordinator.get_stats();
    assert_eq!(stats.urls_fetched, 3);
    assert_eq!(stats.items_extracted, 4);
    assert_eq!(stats.stop_reason, Some(StopReason::NoNextLink));

    assert_eq!(coordinator.persist_items(&records).unwrap(), 4);
    assert_eq!(coordinator.persist_items(&records).unwrap(), 0);
    assert_eq!(store.lock().unwrap().load_cursor("products").unwrap(), None);

    let out = dir.path().join("out.jsonl");
    assert_eq!(write_jsonl(&out, &records).unwrap(), 4);
    let first_line = std::fs::read_to_string(&out).unwrap();
    let first: serde_json::Value =
        serde_json::from_str(first_line.lines().next().unwrap()).unwrap();
    assert_eq!(first["id"], "a1");
    assert_eq!(first["_meta"]["schema"], "products");
}

#[tokio::test]
async fn test_pagination_cycle_stops() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nAllow: /").await;
    mount_page(&server, "/list/1", product_page(&[("a1", "Anvil")], Some("/list/2")), 1).await;
    mount_page(&server, "/list/2", product_page(&[("b2", "Bolt")], Some("/list/1#again")), 1).await;

    let mut coordinator = Coordinator::new(create_test_fetcher(), create_test_schema());
    let records = coordinator
        .fetch_with_pagination(&format!("{}/list/1", server.uri()), None, false)
        .await
        .unwrap();

    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.meta.is_none()));
    assert_eq!(coordinator.get_stats().stop_reason, Some(StopReason::Cycle));
}

#[tokio::test]
async fn test_self_linking_page_fetched_once() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nAllow: /").await;
    mount_page(&server, "/only", product_page(&[("a1", "Anvil")], Some("/only")), 1).await;

    let mut coordinator = Coordinator::new(create_test_fetcher(), create_test_schema());
    let records = coordinator
        .fetch_with_pagination(&format!("{}/only", server.uri()), None, false)
        .await
        .unwrap();

    assert_eq!(records.len(), 1);
    let stats = coordinator.get_stats();
    assert_eq!(stats.urls_fetched, 1);
    assert_eq!(stats.stop_reason, Some(StopReason::Cycle));
}

#[tokio::test]
async fn test_robots_disallowed_start_page_is_error() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nDisallow: /list").await;
    mount_page(&server, "/list/1", product_page(&[("a1", "Anvil")], None), 0).await;

    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let mut coordinator = Coordinator::new(create_test_fetcher(), create_test_schema())
        .with_job("products", Arc::clone(&store));

    let err = coordinator
        .fetch_with_pagination(&format!("{}/list/1", server.uri()), None, false)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        GleanError::Fetch(FetchError::RobotsDisallowed(_))
    ));
    assert_eq!(coordinator.get_stats().errors, 1);
    assert_eq!(store.lock().unwrap().failed_urls("products").unwrap().len(), 1);
}

#[tokio::test]
async fn test_503_retried_then_succeeds() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nAllow: /").await;
    Mock::given(method("GET"))
        .and(path("/list/1"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, "/list/1", product_page(&[("a1", "Anvil")], None), 1).await;

    let mut coordinator = Coordinator::new(create_test_fetcher(), create_test_schema());
    let records = coordinator
        .fetch_url(&format!("{}/list/1", server.uri()), false)
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(coordinator.get_stats().errors, 0);
}

#[tokio::test]
async fn test_blocked_403_not_retried() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nAllow: /").await;
    Mock::given(method("GET"))
        .and(path("/list/1"))
        .respond_with(ResponseTemplate::new(403).insert_header("x-datadome", "protected"))
        .expect(1)
        .mount(&server)
        .await;

    let mut coordinator = Coordinator::new(create_test_fetcher(), create_test_schema());
    let err = coordinator
        .fetch_url(&format!("{}/list/1", server.uri()), false)
        .await
        .unwrap_err();
    match err {
        GleanError::Fetch(FetchError::Blocked { vendor, status }) => {
            assert_eq!(vendor, "datadome");
            assert_eq!(status, 403);
        }
        other => panic!("expected Blocked, got {:?}", other),
    }
}

#[tokio::test]
async fn test_404_not_retried_and_recorded() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nAllow: /").await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let mut coordinator = Coordinator::new(create_test_fetcher(), create_test_schema())
        .with_job("products", Arc::clone(&store));

    let url = format!("{}/gone", server.uri());
    assert!(coordinator.fetch_url(&url, false).await.is_err());

    let failed = store.lock().unwrap().failed_urls("products").unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].url, url);
    assert_eq!(failed[0].retry_count, 1);
    assert_eq!(failed[0].error_message, "HTTP 404");
}

#[tokio::test]
async fn test_resume_from_cursor_after_failure() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nAllow: /").await;
    mount_page(&server, "/list/1", product_page(&[("a1", "Anvil")], Some("/list/2")), 1).await;
    Mock::given(method("GET"))
        .and(path("/list/2"))
        .respond_with(ResponseTemplate::new(404))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, "/list/2", product_page(&[("b2", "Bolt")], None), 1).await;

    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let start = format!("{}/list/1", server.uri());

    let mut first = Coordinator::new(create_test_fetcher(), create_test_schema())
        .with_job("products", Arc::clone(&store));
    let records = first.fetch_with_pagination(&start, None, false).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(first.get_stats().stop_reason, Some(StopReason::FetchFailed));
    assert_eq!(
        store.lock().unwrap().load_cursor("products").unwrap(),
        Some(format!("{}/list/2", server.uri()))
    );

    let mut second = Coordinator::new(create_test_fetcher(), create_test_schema())
        .with_job("products", Arc::clone(&store));
    let records = second.resume_with_pagination(&start, None, false).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].get("id").unwrap(), "b2");
    assert_eq!(store.lock().unwrap().load_cursor("products").unwrap(), None);
}

#[tokio::test]
async fn test_cancellation_stops_retries() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nAllow: /").await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let limiter = Arc::new(RateLimiter::new(50.0, 5));
    let robots = Arc::new(RobotsPolicy::new("gleaner").unwrap());
    let fetcher = HttpFetcher::new(limiter, robots)
        .unwrap()
        .with_max_attempts(5);

    let cancel = fetcher.cancel_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        cancel.cancel();
    });

    let started = Instant::now();
    let err = fetcher
        .fetch_page(&format!("{}/slow", server.uri()))
        .await
        .unwrap_err();
    assert_eq!(err, FetchError::Cancelled);
    // the first 503 backoff alone is at least 1.5 s
    assert!(started.elapsed() < Duration::from_millis(1400));
}
