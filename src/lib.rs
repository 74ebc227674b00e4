// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # GovInfo Scraper
//!
//! Walks the paginated collections endpoint of the GovInfo API and writes the
//! package summaries it returns to a CSV or Parquet file.
//!
//! ## Features
//!
//! - **Rate Limiting**: a minimum interval between any two requests
//! - **Retries**: transient failures retried with backoff, `Retry-After` honored
//! - **Cursor Pagination**: `offsetMark` tokens followed until exhausted or capped
//! - **All-or-nothing Export**: rows are written only when every page arrived
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use govinfo_scraper::{CollectionScraper, ScraperConfig, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = ScraperConfig::load(None)?;
//!     let scraper = CollectionScraper::from_config(&config)?;
//!
//!     let result = scraper.scrape_collection("BILLS", None, None, Some(500)).await?;
//!     println!("{} rows in {}", result.total, result.output_path.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! CollectionScraper ── CollectionLookup (catalog)
//!        │
//!        ├── PageWalker ── fetch_with_retry ── HttpClient ── RateLimiter
//!        │        │
//!        │        └── RecordFlattener
//!        │
//!        └── Exporter (CSV / Parquet)
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// HTTP client with rate limiting and failure classification
pub mod http;

/// Cursor walk and retry policy
pub mod pagination;

/// Record to row flattening
pub mod flatten;

/// Collection catalog
pub mod collections;

/// Configuration loading
pub mod config;

/// CSV/Parquet export
pub mod output;

/// Scrape orchestration
pub mod scraper;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use collections::{ApiCollectionCatalog, Collection, CollectionLookup, StaticCatalog};
pub use config::ScraperConfig;
pub use scraper::{CollectionScraper, ScrapeResult};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
