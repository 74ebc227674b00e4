//! Collection scraper
//!
//! Ties the pieces together: checks the collection code against the catalog,
//! walks its pages, and exports the flattened rows to one file.

use crate::collections::{ApiCollectionCatalog, CollectionLookup};
use crate::config::ScraperConfig;
use crate::error::{Error, Result};
use crate::flatten::{ColumnFlattener, FlatRow, RecordFlattener};
use crate::http::HttpClient;
use crate::output::{export_path, exporter_for, CsvExporter, Exporter};
use crate::pagination::{
    format_timestamp, DateWindow, PageWalker, WalkRequest, WalkStats, WalkerConfig,
    DEFAULT_PAGE_SIZE,
};
use chrono::{DateTime, Local, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Outcome of a successful scrape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeResult {
    /// Canonical collection code
    pub collection: String,
    /// Column header
    pub columns: Vec<String>,
    /// Rows in server order
    pub rows: Vec<FlatRow>,
    /// Number of rows
    pub total: usize,
    /// Walk statistics
    pub stats: WalkStats,
    /// File the rows were written to
    pub output_path: PathBuf,
}

/// Scrapes one collection at a time into a tabular file
pub struct CollectionScraper {
    client: Arc<HttpClient>,
    catalog: Box<dyn CollectionLookup>,
    flattener: Box<dyn RecordFlattener>,
    exporter: Box<dyn Exporter>,
    walker_config: WalkerConfig,
    page_size: u32,
    output_dir: PathBuf,
}

impl CollectionScraper {
    /// Create a scraper with package columns, CSV output, and default walk settings
    pub fn new(client: Arc<HttpClient>, catalog: Box<dyn CollectionLookup>) -> Self {
        Self {
            client,
            catalog,
            flattener: Box::new(ColumnFlattener::packages()),
            exporter: Box::new(CsvExporter::new()),
            walker_config: WalkerConfig::default(),
            page_size: DEFAULT_PAGE_SIZE,
            output_dir: PathBuf::from("scraped_data"),
        }
    }

    /// Build a scraper backed by the live catalog
    pub fn from_config(config: &ScraperConfig) -> Result<Self> {
        let client = Arc::new(config.http_client()?);
        let catalog = ApiCollectionCatalog::new(Arc::clone(&client)).with_retry(config.retry_policy());

        Ok(Self::new(client, Box::new(catalog))
            .with_flattener(Box::new(config.flattener()))
            .with_exporter(exporter_for(config.format))
            .with_walker_config(config.walker_config())
            .with_page_size(config.page_size)
            .with_output_dir(&config.output_dir))
    }

    /// Set the record flattener
    #[must_use]
    pub fn with_flattener(mut self, flattener: Box<dyn RecordFlattener>) -> Self {
        self.flattener = flattener;
        self
    }

    /// Set the exporter
    #[must_use]
    pub fn with_exporter(mut self, exporter: Box<dyn Exporter>) -> Self {
        self.exporter = exporter;
        self
    }

    /// Set walker configuration
    #[must_use]
    pub fn with_walker_config(mut self, config: WalkerConfig) -> Self {
        self.walker_config = config;
        self
    }

    /// Set the page size
    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set the output directory
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.output_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Collection catalog in use
    pub fn catalog(&self) -> &dyn CollectionLookup {
        self.catalog.as_ref()
    }

    /// Output directory in use
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Scrape `code` over the last-modified window `[start, end]`
    ///
    /// Nothing is written unless every page was fetched. The file lands at
    /// `{output_dir}/{code}_{YYYYmmdd_HHMMSS}.{ext}`.
    pub async fn scrape_collection(
        &self,
        code: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        max_items: Option<usize>,
    ) -> Result<ScrapeResult> {
        let code = code.trim();
        if code.is_empty() {
            return Err(Error::invalid_value("collection", "code cannot be empty"));
        }
        if let (Some(s), Some(e)) = (start, end) {
            if s > e {
                return Err(Error::invalid_value(
                    "window",
                    format!(
                        "start {} is after end {}",
                        format_timestamp(&s),
                        format_timestamp(&e)
                    ),
                ));
            }
        }

        let collection = self
            .catalog
            .find(code)
            .await?
            .ok_or_else(|| Error::unknown_collection(code))?;
        let code = collection.collection_code;

        info!("Scraping {code} (max items: {max_items:?})");

        let request = WalkRequest::new(code.clone(), DateWindow::new(start, end))
            .with_page_size(self.page_size)
            .with_max_items(max_items);

        let mut walker = PageWalker::new(&self.client, self.flattener.as_ref())
            .with_config(self.walker_config.clone());
        let outcome = walker.walk(&request).await?;

        let columns = self.flattener.columns().to_vec();
        let output_path = export_path(
            &self.output_dir,
            &code,
            &Local::now(),
            self.exporter.format(),
        )?;
        self.exporter.export(&output_path, &columns, &outcome.rows)?;

        info!(
            "Scraped {} rows from {code} into {}",
            outcome.rows.len(),
            output_path.display()
        );

        Ok(ScrapeResult {
            collection: code,
            columns,
            total: outcome.rows.len(),
            rows: outcome.rows,
            stats: outcome.stats,
            output_path,
        })
    }
}

impl std::fmt::Debug for CollectionScraper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionScraper")
            .field("columns", &self.flattener.columns())
            .field("format", &self.exporter.format())
            .field("walker_config", &self.walker_config)
            .field("page_size", &self.page_size)
            .field("output_dir", &self.output_dir)
            .finish_non_exhaustive()
    }
}
