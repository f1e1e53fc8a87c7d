//! Crawl session behaviour against an in-memory site and a mock HTTP origin

use std::path::Path;
use std::sync::Arc;

use kodegen_tools_sitemirror::config::CrawlConfig;
use kodegen_tools_sitemirror::crawl_engine::{
    CrawlCancellation, CrawlContext, CrawlReport, CrawlScheduler, NoOpProgress, ProgressReporter,
};
use kodegen_tools_sitemirror::patterns::PatternLearner;
use tempfile::TempDir;

mod common;
use common::{FakeSite, create_test_html};

fn config(dir: &TempDir) -> CrawlConfig {
    CrawlConfig::builder()
        .storage_dir(dir.path())
        .start_url("http://example.com/")
        .fetch_timeout_secs(1)
        .build()
        .unwrap()
}

async fn run(config: CrawlConfig, site: &Arc<FakeSite>) -> CrawlReport {
    let context = CrawlContext {
        config,
        fetcher: Arc::clone(site),
        patterns: None,
        progress: Arc::new(NoOpProgress),
    };
    CrawlScheduler::new(context).unwrap().crawl().await.unwrap()
}

fn read(root: &Path, relative: &str) -> String {
    std::fs::read_to_string(root.join(relative)).unwrap()
}

#[tokio::test]
async fn test_shared_link_fetched_once() {
    let dir = TempDir::new().unwrap();
    let site = Arc::new(
        FakeSite::new()
            .html(
                "http://example.com/",
                create_test_html("Home", r#"<a href="/a">A</a> <a href="/b">B</a>"#),
            )
            .html(
                "http://example.com/a",
                create_test_html("A", r#"<a href="/shared#top">S</a> <a href="/">Home</a>"#),
            )
            .html(
                "http://example.com/b",
                create_test_html("B", r#"<a href="http://example.com/shared">S</a>"#),
            )
            .html("http://example.com/shared", create_test_html("Shared", "<p>x</p>")),
    );

    let report = run(config(&dir), &site).await;

    assert_eq!(report.pages_persisted, 4);
    assert_eq!(report.visited, 4);
    assert!(report.pages_failed.is_empty());
    assert!(!report.cancelled);
    assert_eq!(site.hits("http://example.com/shared"), 1);
    assert_eq!(site.hits("http://example.com/"), 1);

    let b = read(dir.path(), "b/index.html");
    assert!(b.contains(r#"href="/shared""#), "{b}");
    assert!(dir.path().join("index.html").exists());
    assert!(dir.path().join("shared").join("index.html").exists());
}

#[tokio::test]
async fn test_single_page_failures_do_not_abort() {
    let dir = TempDir::new().unwrap();
    let site = Arc::new(
        FakeSite::new()
            .html(
                "http://example.com/",
                r#"<a href="/broken">1</a><a href="/gone">2</a><a href="/slow">3</a><a href="/ok">4</a>"#,
            )
            .status("http://example.com/broken", 500)
            .hang("http://example.com/slow")
            .html("http://example.com/ok", "<p>fine</p>"),
    );

    let report = run(config(&dir), &site).await;

    assert_eq!(report.pages_persisted, 2);
    let failed: Vec<&str> = report.pages_failed.iter().map(|(url, _)| url.as_str()).collect();
    assert_eq!(
        failed,
        vec![
            "http://example.com/broken",
            "http://example.com/gone",
            "http://example.com/slow",
        ]
    );
    let (_, slow_reason) = &report.pages_failed[2];
    assert!(slow_reason.contains("timed out"), "{slow_reason}");
    assert!(dir.path().join("ok").join("index.html").exists());
}

#[tokio::test]
async fn test_resources_mirrored_once_and_cross_origin_ignored() {
    let dir = TempDir::new().unwrap();
    let page = |title: &str| {
        create_test_html(
            title,
            r#"<link rel="stylesheet" href="/css/site.css">
               <img src="img/logo.png" srcset="/img/logo.png 1x, /img/logo@2x.png 2x">
               <script src="https://cdn.other.net/lib.js"></script>
               <a href="/next">next</a>"#,
        )
    };
    let site = Arc::new(
        FakeSite::new()
            .html("http://example.com/", page("Home"))
            .html("http://example.com/next", page("Next"))
            .file("http://example.com/css/site.css", "text/css", b"body{}")
            .file("http://example.com/img/logo.png", "image/png", b"\x89PNG")
            .file("http://example.com/img/logo@2x.png", "image/png", b"\x89PNG2"),
    );

    let report = run(config(&dir), &site).await;

    assert_eq!(report.pages_persisted, 2);
    assert_eq!(report.resources_saved, 3);
    assert_eq!(site.hits("http://example.com/css/site.css"), 1);
    assert_eq!(site.hits("https://cdn.other.net/lib.js"), 0);
    assert_eq!(read(dir.path(), "css/site.css"), "body{}");
    assert_eq!(std::fs::read(dir.path().join("img/logo@2x.png")).unwrap(), b"\x89PNG2");

    let home = read(dir.path(), "index.html");
    assert!(home.contains(r#"src="/img/logo.png""#), "{home}");
    assert!(home.contains(r#"src="https://cdn.other.net/lib.js""#));
}

#[tokio::test]
async fn test_resources_skipped_when_disabled() {
    let dir = TempDir::new().unwrap();
    let config = CrawlConfig::builder()
        .storage_dir(dir.path())
        .start_url("http://example.com/")
        .download_resources(false)
        .build()
        .unwrap();
    let site = Arc::new(
        FakeSite::new()
            .html("http://example.com/", r#"<img src="/logo.png">"#)
            .file("http://example.com/logo.png", "image/png", b"png"),
    );

    let report = run(config, &site).await;

    assert_eq!(report.resources_saved, 0);
    assert_eq!(site.total_hits(), 1);
}

#[tokio::test]
async fn test_query_variants_collapse_onto_one_file() {
    let dir = TempDir::new().unwrap();
    let site = Arc::new(
        FakeSite::new()
            .html(
                "http://example.com/",
                r#"<a href="/list?page=1">1</a><a href="/list?page=2">2</a>"#,
            )
            .html("http://example.com/list?page=1", "one")
            .html("http://example.com/list?page=2", "two"),
    );

    let report = run(config(&dir), &site).await;

    // Distinct URLs, distinct fetches, one mirror file
    assert_eq!(report.visited, 3);
    assert_eq!(site.hits("http://example.com/list?page=1"), 1);
    assert_eq!(site.hits("http://example.com/list?page=2"), 1);
    let list = read(dir.path(), "list/index.html");
    assert!(list.contains("one") || list.contains("two"));
}

#[tokio::test]
async fn test_excluded_patterns_not_followed() {
    let dir = TempDir::new().unwrap();
    let config = CrawlConfig::builder()
        .storage_dir(dir.path())
        .start_url("http://example.com/")
        .excluded_patterns(vec!["*/private/*".to_string()])
        .build()
        .unwrap();
    let site = Arc::new(
        FakeSite::new()
            .html(
                "http://example.com/",
                r#"<a href="/private/keys">k</a><a href="/public">p</a>"#,
            )
            .html("http://example.com/public", "p"),
    );

    let report = run(config, &site).await;

    assert_eq!(report.pages_persisted, 2);
    assert_eq!(site.hits("http://example.com/private/keys"), 0);
}

/// Cancels the session as soon as the first page is written
struct CancelAfterFirstPage(CrawlCancellation);

impl ProgressReporter for CancelAfterFirstPage {
    fn report_started(&self, _seed: &str) {}
    fn report_fetching(&self, _url: &str, _depth: u8) {}
    fn report_page_persisted(&self, _url: &str, _path: &Path) {
        self.0.cancel();
    }
    fn report_page_failed(&self, _url: &str, _error: &str) {}
    fn report_resource_saved(&self, _url: &str, _path: &Path) {}
    fn report_completed(&self, _report: &CrawlReport) {}
}

#[tokio::test]
async fn test_cancellation_stops_admission() {
    let dir = TempDir::new().unwrap();
    let cancellation = CrawlCancellation::new();
    let site = Arc::new(
        FakeSite::new()
            .html("http://example.com/", r#"<a href="/a">a</a><a href="/b">b</a>"#)
            .html("http://example.com/a", "a")
            .html("http://example.com/b", "b"),
    );
    let context = CrawlContext {
        config: config(&dir),
        fetcher: Arc::clone(&site),
        patterns: None,
        progress: Arc::new(CancelAfterFirstPage(cancellation.clone())),
    };

    let report = CrawlScheduler::new(context)
        .unwrap()
        .with_cancellation(cancellation)
        .crawl()
        .await
        .unwrap();

    assert!(report.cancelled);
    assert_eq!(report.visited, 1);
    assert_eq!(report.pages_persisted, 1);
    assert_eq!(site.hits("http://example.com/a"), 0);
}

#[tokio::test]
async fn test_registry_on_disk_normalizes_stale_links() {
    let dir = TempDir::new().unwrap();
    let registry = dir.path().join("url_patterns.json");
    std::fs::write(
        &registry,
        r#"{
          "docs/{id}/intro": {
            "example_old": "http://example.com/docs/1/intro",
            "example_new": "http://example.com/docs/latest/intro",
            "last_updated": "2024-05-01T10:00:00"
          }
        }"#,
    )
    .unwrap();

    let site = Arc::new(
        FakeSite::new()
            .html("http://example.com/", r#"<a href="/docs/3/intro">old docs</a>"#)
            .html("http://example.com/docs/latest/intro", "current"),
    );
    let context = CrawlContext {
        config: config(&dir),
        fetcher: Arc::clone(&site),
        patterns: Some(Arc::new(PatternLearner::open(&registry).await)),
        progress: Arc::new(NoOpProgress),
    };

    let report = CrawlScheduler::new(context).unwrap().crawl().await.unwrap();

    assert!(report.pages_failed.is_empty(), "{:?}", report.pages_failed);
    assert_eq!(site.hits("http://example.com/docs/3/intro"), 0);
    assert_eq!(site.hits("http://example.com/docs/latest/intro"), 1);
}

#[tokio::test]
async fn test_http_crawl_against_mock_origin() {
    let mut server = mockito::Server::new_async().await;
    let home = server
        .mock("GET", "/")
        .with_header("content-type", "text/html")
        .with_body(r#"<html><body><a href="/about">About</a><img src="/logo.png"></body></html>"#)
        .expect(1)
        .create_async()
        .await;
    let about = server
        .mock("GET", "/about")
        .with_header("content-type", "text/html")
        .with_body(r#"<a href="/">Home</a>"#)
        .expect(1)
        .create_async()
        .await;
    let logo = server
        .mock("GET", "/logo.png")
        .with_header("content-type", "image/png")
        .with_body([0x89, b'P', b'N', b'G'])
        .expect(1)
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let config = CrawlConfig::builder()
        .storage_dir(dir.path())
        .start_url(server.url())
        .build()
        .unwrap();

    let report = kodegen_tools_sitemirror::crawl(config).await.unwrap();

    home.assert_async().await;
    about.assert_async().await;
    logo.assert_async().await;
    assert_eq!(report.pages_persisted, 2);
    assert_eq!(report.resources_saved, 1);
    assert!(dir.path().join("about").join("index.html").exists());
    assert!(dir.path().join("logo.png").exists());
}

#[tokio::test]
async fn test_redirected_seed_resolves_links_against_final_url() {
    let mut server = mockito::Server::new_async().await;
    let base = server.url();
    server
        .mock("GET", "/docs")
        .with_status(301)
        .with_header("location", &format!("{base}/docs/"))
        .create_async()
        .await;
    server
        .mock("GET", "/docs/")
        .with_header("content-type", "text/html")
        .with_body(r#"<a href="intro">Intro</a>"#)
        .create_async()
        .await;
    let intro = server
        .mock("GET", "/docs/intro")
        .with_header("content-type", "text/html")
        .with_body("<p>intro</p>")
        .expect(1)
        .create_async()
        .await;
    let wrong = server
        .mock("GET", "/intro")
        .with_status(404)
        .expect(0)
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let config = CrawlConfig::builder()
        .storage_dir(dir.path())
        .start_url(format!("{base}/docs"))
        .build()
        .unwrap();

    let report = kodegen_tools_sitemirror::crawl(config).await.unwrap();

    assert!(report.pages_failed.is_empty(), "{:?}", report.pages_failed);
    intro.assert_async().await;
    wrong.assert_async().await;
    let docs = read(dir.path(), "docs/index.html");
    assert!(docs.contains(r#"href="/docs/intro""#), "{docs}");
}
