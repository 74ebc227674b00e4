//! CLI module
//!
//! Command-line interface for the scraper.
//!
//! # Commands
//!
//! - `collections` - List available collections
//! - `scrape` - Scrape one collection to a CSV or Parquet file
//! - no subcommand - List collections, then scrape recent BILLS

mod commands;
mod runner;

pub use commands::{parse_end, parse_start, Cli, Commands, ReportFormat};
pub use runner::{Runner, DEFAULT_COLLECTION, DEFAULT_MAX_ITEMS, DEFAULT_WINDOW_DAYS};
