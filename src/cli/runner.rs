//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, ReportFormat};
use crate::config::ScraperConfig;
use crate::error::{Error, Result};
use crate::scraper::{CollectionScraper, ScrapeResult};
use crate::types::ExportFormat;
use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};
use std::path::PathBuf;
use tracing::{error, info};

/// Collection scraped when no subcommand is given
pub const DEFAULT_COLLECTION: &str = "BILLS";

/// Days back the default window reaches
pub const DEFAULT_WINDOW_DAYS: i64 = 30;

/// Item cap of the default run
pub const DEFAULT_MAX_ITEMS: usize = 500;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Load configuration and run the CLI command
    pub async fn run(&self) -> Result<()> {
        let config = ScraperConfig::load(self.cli.config.as_deref())?;
        self.run_with_config(config).await
    }

    /// Run the CLI command against an already loaded configuration
    pub async fn run_with_config(&self, config: ScraperConfig) -> Result<()> {
        match &self.cli.command {
            Some(Commands::Collections) => {
                let scraper = CollectionScraper::from_config(&config)?;
                self.collections(&scraper).await
            }
            Some(Commands::Scrape {
                collection,
                start,
                end,
                max_items,
                format,
                output_dir,
            }) => {
                let config = with_overrides(config, *format, output_dir.clone());
                let scraper = CollectionScraper::from_config(&config)?;
                self.scrape(&scraper, collection, *start, *end, *max_items)
                    .await
                    .map(|_| ())
            }
            None => self.default_run(&config).await,
        }
    }

    /// List collections, then scrape the default collection
    async fn default_run(&self, config: &ScraperConfig) -> Result<()> {
        let scraper = CollectionScraper::from_config(config)?;
        self.collections(&scraper).await?;

        info!(
            "Scraping {DEFAULT_COLLECTION} for the last {DEFAULT_WINDOW_DAYS} days (max {DEFAULT_MAX_ITEMS} items)"
        );
        self.scrape(
            &scraper,
            DEFAULT_COLLECTION,
            None,
            None,
            Some(DEFAULT_MAX_ITEMS),
        )
        .await
        .map(|_| ())
    }

    async fn collections(&self, scraper: &CollectionScraper) -> Result<()> {
        let collections = scraper.catalog().list_collections().await?;
        self.output_message(&json!({
            "type": "COLLECTIONS",
            "count": collections.len(),
            "collections": collections,
        }));
        Ok(())
    }

    async fn scrape(
        &self,
        scraper: &CollectionScraper,
        collection: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        max_items: Option<usize>,
    ) -> Result<ScrapeResult> {
        let now = Utc::now();
        let start = start.unwrap_or(now - Duration::days(DEFAULT_WINDOW_DAYS));
        let end = end.unwrap_or(now);

        match scraper
            .scrape_collection(collection, Some(start), Some(end), max_items)
            .await
        {
            Ok(result) => {
                self.output_message(&scrape_message(&result));
                Ok(result)
            }
            Err(e) => {
                error!("Scrape of {collection} failed: {e}");
                self.output_message(&failure_message(collection, &e));
                Err(e)
            }
        }
    }

    /// Output a message
    fn output_message(&self, msg: &Value) {
        match self.cli.report {
            ReportFormat::Json => {
                println!("{}", serde_json::to_string(msg).unwrap_or_default());
            }
            ReportFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
            }
        }
    }
}

fn with_overrides(
    mut config: ScraperConfig,
    format: Option<ExportFormat>,
    output_dir: Option<PathBuf>,
) -> ScraperConfig {
    if let Some(format) = format {
        config.format = format;
    }
    if let Some(dir) = output_dir {
        config.output_dir = dir;
    }
    config
}

fn scrape_message(result: &ScrapeResult) -> Value {
    json!({
        "type": "SCRAPE",
        "collection": result.collection,
        "rows": result.total,
        "columns": result.columns,
        "pages_fetched": result.stats.pages_fetched,
        "retries": result.stats.retries,
        "duplicates_skipped": result.stats.duplicates_skipped,
        "capped": result.stats.capped,
        "duration_ms": result.stats.duration_ms,
        "output": result.output_path.display().to_string(),
    })
}

/// End-of-run summary for a scrape that produced no file
fn failure_message(collection: &str, error: &Error) -> Value {
    json!({
        "type": "FAILURE",
        "collection": collection,
        "page": error.failed_page(),
        "fetch_error": error.is_fetch_error(),
        "error": error.to_string(),
        "output": Value::Null,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::tempdir;
    use wiremock::matchers::{method, path, path_regex, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(server: &MockServer, dir: &std::path::Path) -> ScraperConfig {
        ScraperConfig {
            base_url: server.uri(),
            api_key: Some("test-key".to_string()),
            output_dir: dir.to_path_buf(),
            min_interval_ms: 0,
            ..Default::default()
        }
    }

    async fn mount_listing(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/collections"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "collections": [
                    {"collectionCode": "BILLS", "collectionName": "Congressional Bills"}
                ]
            })))
            .expect(1)
            .mount(server)
            .await;
    }

    #[test]
    fn test_with_overrides() {
        let config = with_overrides(
            ScraperConfig::default(),
            Some(ExportFormat::Parquet),
            Some(PathBuf::from("elsewhere")),
        );
        assert_eq!(config.format, ExportFormat::Parquet);
        assert_eq!(config.output_dir, PathBuf::from("elsewhere"));

        let untouched = with_overrides(ScraperConfig::default(), None, None);
        assert_eq!(untouched.format, ExportFormat::Csv);
        assert_eq!(untouched.output_dir, PathBuf::from("scraped_data"));
    }

    #[tokio::test]
    async fn test_default_run_lists_then_scrapes_bills() {
        let server = MockServer::start().await;
        let dir = tempdir().unwrap();
        mount_listing(&server).await;

        Mock::given(method("GET"))
            .and(path_regex("^/collections/BILLS/.+Z/.+Z$"))
            .and(query_param("offsetMark", "*"))
            .and(query_param("pageSize", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "count": 1,
                "nextPage": null,
                "packages": [{"packageId": "BILLS-118hr1ih", "title": "A bill"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let runner = Runner::new(Cli::try_parse_from(["govinfo-scraper", "-r", "json"]).unwrap());
        runner
            .run_with_config(config(&server, dir.path()))
            .await
            .unwrap();

        let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_failure_message_names_failed_page() {
        let err = Error::FatalFetch {
            page: 2,
            status: 403,
            body: "API_KEY_INVALID".to_string(),
        };
        let msg = failure_message("BILLS", &err);

        assert_eq!(msg["type"], "FAILURE");
        assert_eq!(msg["collection"], "BILLS");
        assert_eq!(msg["page"], 2);
        assert_eq!(msg["fetch_error"], true);
        assert!(msg["error"].as_str().unwrap().contains("API_KEY_INVALID"));
        assert!(msg["output"].is_null());
    }

    #[test]
    fn test_failure_message_without_page() {
        let msg = failure_message("NOPE", &Error::unknown_collection("NOPE"));
        assert!(msg["page"].is_null());
        assert_eq!(msg["fetch_error"], false);
    }

    #[tokio::test]
    async fn test_scrape_rejected_page_reports_and_writes_nothing() {
        let server = MockServer::start().await;
        let dir = tempdir().unwrap();
        mount_listing(&server).await;

        Mock::given(method("GET"))
            .and(path_regex("^/collections/BILLS/.+Z/.+Z$"))
            .respond_with(ResponseTemplate::new(403).set_body_string("API_KEY_INVALID"))
            .expect(1)
            .mount(&server)
            .await;

        let runner = Runner::new(
            Cli::try_parse_from(["govinfo-scraper", "-r", "json", "scrape", "--collection", "bills"])
                .unwrap(),
        );
        let err = runner
            .run_with_config(config(&server, dir.path()))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::FatalFetch { page: 0, status: 403, .. }));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_scrape_unknown_collection_fails() {
        let server = MockServer::start().await;
        let dir = tempdir().unwrap();
        mount_listing(&server).await;

        let runner = Runner::new(
            Cli::try_parse_from(["govinfo-scraper", "scrape", "--collection", "NOPE"]).unwrap(),
        );
        let err = runner
            .run_with_config(config(&server, dir.path()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnknownCollection { .. }));
    }
}
