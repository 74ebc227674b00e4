//! CLI commands and argument parsing

use crate::types::ExportFormat;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// GovInfo collection scraper
///
/// Without a subcommand, lists collections and then scrapes BILLS for the
/// last 30 days, capped at 500 items.
#[derive(Parser, Debug)]
#[command(name = "govinfo-scraper")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (YAML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Report format on stdout
    #[arg(short, long, global = true, default_value = "pretty")]
    pub report: ReportFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List available collections
    Collections,

    /// Scrape one collection to a file
    Scrape {
        /// Collection code (e.g. BILLS)
        #[arg(long, default_value = "BILLS")]
        collection: String,

        /// Window start: YYYY-MM-DD or RFC 3339 (default: 30 days ago)
        #[arg(long, value_parser = parse_start)]
        start: Option<DateTime<Utc>>,

        /// Window end: YYYY-MM-DD (end of day) or RFC 3339 (default: now)
        #[arg(long, value_parser = parse_end)]
        end: Option<DateTime<Utc>>,

        /// Stop after this many items
        #[arg(long)]
        max_items: Option<usize>,

        /// Export format (overrides the config file)
        #[arg(long)]
        format: Option<ExportFormat>,

        /// Output directory (overrides the config file)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
}

/// Report format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ReportFormat {
    /// One JSON object per line
    Json,
    /// Human-readable output
    Pretty,
}

/// Parse a window start; a bare date means midnight UTC
pub fn parse_start(s: &str) -> Result<DateTime<Utc>, String> {
    parse_instant(s, NaiveTime::MIN)
}

/// Parse a window end; a bare date means the last second of that day
pub fn parse_end(s: &str) -> Result<DateTime<Utc>, String> {
    let end_of_day = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
    parse_instant(s, end_of_day)
}

fn parse_instant(s: &str, time_of_day: NaiveTime) -> Result<DateTime<Utc>, String> {
    let s = s.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map(|date| date.and_time(time_of_day).and_utc())
        .map_err(|_| format!("invalid date '{s}': expected YYYY-MM-DD or RFC 3339"))
}
