//! Integration tests using mock HTTP server
//!
//! Tests the full end-to-end flow: YAML config → listing → page walk → file

use govinfo_scraper::{CollectionLookup, CollectionScraper, Error, ExportFormat, ScraperConfig};
use serde_json::{json, Value};
use std::path::Path;
use std::time::{Duration, Instant};
use tempfile::tempdir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BILLS_PATH: &str = "/collections/BILLS/2024-01-01T00:00:00Z/2024-03-19T23:59:59Z";

fn config(server: &MockServer, dir: &Path, extra: &str) -> ScraperConfig {
    let yaml = format!(
        "base_url: {}\napi_key: integration-key\noutput_dir: {}\nmin_interval_ms: 0\nretry:\n  initial_backoff_ms: 5\n  max_backoff_ms: 50\n{extra}",
        server.uri(),
        dir.display()
    );
    let config = ScraperConfig::from_yaml_str(&yaml).unwrap();
    config.validate().unwrap();
    config
}

fn window() -> (
    Option<chrono::DateTime<chrono::Utc>>,
    Option<chrono::DateTime<chrono::Utc>>,
) {
    (
        Some("2024-01-01T00:00:00Z".parse().unwrap()),
        Some("2024-03-19T23:59:59Z".parse().unwrap()),
    )
}

async fn mount_listing(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/collections"))
        .and(query_param("api_key", "integration-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "collections": [
                {"collectionCode": "BILLS", "collectionName": "Congressional Bills", "packageCount": 3},
                {"collectionCode": "FR", "collectionName": "Federal Register"}
            ]
        })))
        .mount(server)
        .await;
}

fn package(id: &str, title: &str) -> Value {
    json!({
        "packageId": id,
        "lastModified": "2024-02-01T10:00:00Z",
        "packageLink": format!("https://api.govinfo.gov/packages/{id}/summary"),
        "docClass": "hr",
        "title": title,
        "congress": "118",
        "dateIssued": "2024-01-09"
    })
}

async fn mount_page(server: &MockServer, token: &str, records: Vec<Value>, next: Option<&str>) {
    let next_page = next.map(|t| format!("{}{BILLS_PATH}?offsetMark={t}&pageSize=100", server.uri()));
    Mock::given(method("GET"))
        .and(path(BILLS_PATH))
        .and(query_param("offsetMark", token))
        .and(query_param("api_key", "integration-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": records.len(),
            "nextPage": next_page,
            "packages": records
        })))
        .mount(server)
        .await;
}

// ============================================================================
// End-to-end Tests
// ============================================================================

#[tokio::test]
async fn test_yaml_config_to_csv() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();
    mount_listing(&server).await;
    mount_page(
        &server,
        "*",
        vec![package("BILLS-118hr1ih", "Lower Energy Costs Act")],
        Some("AoJwk"),
    )
    .await;
    mount_page(
        &server,
        "AoJwk",
        vec![package("BILLS-118hr2ih", "Secure the Border Act")],
        None,
    )
    .await;

    let config = config(&server, dir.path(), "");
    let scraper = CollectionScraper::from_config(&config).unwrap();

    let listed = scraper.catalog().list_collections().await.unwrap();
    assert_eq!(listed.len(), 2);

    let (start, end) = window();
    let result = scraper
        .scrape_collection("BILLS", start, end, None)
        .await
        .unwrap();

    assert_eq!(result.total, 2);
    assert_eq!(result.stats.pages_fetched, 2);
    assert_eq!(result.stats.reported_count, 2);

    let content = std::fs::read_to_string(&result.output_path).unwrap();
    let mut lines = content.lines();
    assert_eq!(
        lines.next(),
        Some("packageId,lastModified,packageLink,docClass,title,congress,dateIssued")
    );
    assert_eq!(
        lines.next(),
        Some("BILLS-118hr1ih,2024-02-01T10:00:00Z,https://api.govinfo.gov/packages/BILLS-118hr1ih/summary,hr,Lower Energy Costs Act,118,2024-01-09")
    );
    assert!(lines.next().unwrap().starts_with("BILLS-118hr2ih,"));
    assert_eq!(lines.next(), None);
}

#[tokio::test]
async fn test_column_override_and_dedup_across_pages() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();
    mount_listing(&server).await;
    mount_page(
        &server,
        "*",
        vec![package("BILLS-118hr1ih", "One"), package("BILLS-118hr2ih", "Two")],
        Some("t1"),
    )
    .await;
    mount_page(
        &server,
        "t1",
        vec![package("BILLS-118hr2ih", "Two"), package("BILLS-118hr3ih", "Three")],
        None,
    )
    .await;

    let config = config(&server, dir.path(), "columns: [packageId, title]\n");
    let scraper = CollectionScraper::from_config(&config).unwrap();

    let (start, end) = window();
    let result = scraper
        .scrape_collection("BILLS", start, end, None)
        .await
        .unwrap();

    assert_eq!(result.columns, vec!["packageId", "title"]);
    assert_eq!(result.total, 3);
    assert_eq!(result.stats.duplicates_skipped, 1);

    let content = std::fs::read_to_string(&result.output_path).unwrap();
    assert_eq!(
        content.lines().collect::<Vec<_>>(),
        vec![
            "packageId,title",
            "BILLS-118hr1ih,One",
            "BILLS-118hr2ih,Two",
            "BILLS-118hr3ih,Three"
        ]
    );
}

#[tokio::test]
async fn test_parquet_format_from_config() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();
    mount_listing(&server).await;
    mount_page(&server, "*", vec![package("BILLS-118hr1ih", "One")], None).await;

    let config = config(&server, dir.path(), "format: parquet\n");
    assert_eq!(config.format, ExportFormat::Parquet);

    let scraper = CollectionScraper::from_config(&config).unwrap();
    let (start, end) = window();
    let result = scraper
        .scrape_collection("BILLS", start, end, None)
        .await
        .unwrap();

    assert_eq!(
        result.output_path.extension().and_then(|e| e.to_str()),
        Some("parquet")
    );
    assert!(std::fs::metadata(&result.output_path).unwrap().len() > 0);
}

#[tokio::test]
async fn test_requests_are_spaced_by_min_interval() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();
    mount_listing(&server).await;
    mount_page(&server, "*", vec![package("A", "a")], Some("t1")).await;
    mount_page(&server, "t1", vec![package("B", "b")], Some("t2")).await;
    mount_page(&server, "t2", vec![package("C", "c")], None).await;

    let mut config = config(&server, dir.path(), "");
    config.min_interval_ms = 60;
    let scraper = CollectionScraper::from_config(&config).unwrap();

    let started = Instant::now();
    let (start, end) = window();
    let result = scraper
        .scrape_collection("BILLS", start, end, None)
        .await
        .unwrap();

    // listing + 3 pages = 4 requests, 3 gaps
    assert_eq!(result.total, 3);
    assert!(started.elapsed() >= Duration::from_millis(170));
}

#[tokio::test]
async fn test_retry_after_is_capped_by_max_backoff() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();
    mount_listing(&server).await;

    Mock::given(method("GET"))
        .and(path(BILLS_PATH))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "120"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_page(&server, "*", vec![package("A", "a")], None).await;

    let config = config(&server, dir.path(), "");
    let scraper = CollectionScraper::from_config(&config).unwrap();

    let started = Instant::now();
    let (start, end) = window();
    let result = scraper
        .scrape_collection("BILLS", start, end, None)
        .await
        .unwrap();

    assert_eq!(result.total, 1);
    assert_eq!(result.stats.retries, 1);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_missing_api_key_is_config_error() {
    let config = ScraperConfig::from_yaml_str("output_dir: out\n").unwrap();
    let err = config.validate().unwrap_err();
    assert!(matches!(err, Error::Config { .. }));
}

#[tokio::test]
async fn test_unknown_collection_and_abort_leave_no_file() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();
    mount_listing(&server).await;

    Mock::given(method("GET"))
        .and(path(BILLS_PATH))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": {"code": "API_KEY_INVALID"}
        })))
        .mount(&server)
        .await;

    let config = config(&server, dir.path(), "");
    let scraper = CollectionScraper::from_config(&config).unwrap();
    let (start, end) = window();

    let err = scraper
        .scrape_collection("STATUTES", start, end, None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnknownCollection { .. }));

    let err = scraper
        .scrape_collection("BILLS", start, end, Some(500))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::FatalFetch { status: 403, .. }));
    assert!(err.to_string().contains("API_KEY_INVALID"));

    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}
