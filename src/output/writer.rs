//! File exporters
//!
//! Both exporters write one file per scrape from the same all-`Utf8` batch.

use super::batch::rows_to_batch;
use crate::error::{Error, Result};
use crate::flatten::FlatRow;
use crate::types::ExportFormat;
use arrow::csv::WriterBuilder;
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Local};
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Timestamp layout used in output file names
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Build `{dir}/{code}_{timestamp}.{ext}`, creating `dir` if needed
pub fn export_path(
    dir: impl AsRef<Path>,
    code: &str,
    timestamp: &DateTime<Local>,
    format: ExportFormat,
) -> Result<PathBuf> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir).map_err(|e| {
        Error::output(format!("Failed to create directory {}: {e}", dir.display()))
    })?;

    Ok(dir.join(format!(
        "{code}_{}.{}",
        timestamp.format(TIMESTAMP_FORMAT),
        format.extension()
    )))
}

/// Writes a header and rows to a file
pub trait Exporter: Send + Sync {
    /// Format this exporter produces
    fn format(&self) -> ExportFormat;

    /// Write `rows` under `columns` to `path`, returning rows written
    fn export(&self, path: &Path, columns: &[String], rows: &[FlatRow]) -> Result<usize>;
}

/// Exporter for a format with default settings
pub fn exporter_for(format: ExportFormat) -> Box<dyn Exporter> {
    match format {
        ExportFormat::Csv => Box::new(CsvExporter::new()),
        ExportFormat::Parquet => Box::new(ParquetExporter::new()),
    }
}

fn create_file(path: &Path) -> Result<File> {
    File::create(path)
        .map_err(|e| Error::output(format!("Failed to create file {}: {e}", path.display())))
}

// ============================================================================
// CSV
// ============================================================================

/// CSV exporter with a header row
#[derive(Debug, Clone)]
pub struct CsvExporter {
    delimiter: u8,
}

impl Default for CsvExporter {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

impl CsvExporter {
    /// Create a comma-separated exporter
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the field delimiter
    #[must_use]
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    fn write_batch(&self, path: &Path, batch: &RecordBatch) -> Result<()> {
        let file = create_file(path)?;
        let mut writer = WriterBuilder::new()
            .with_header(true)
            .with_delimiter(self.delimiter)
            .build(BufWriter::new(file));
        writer.write(batch)?;
        writer
            .into_inner()
            .flush()
            .map_err(|e| Error::output(format!("Failed to flush {}: {e}", path.display())))?;
        Ok(())
    }
}

impl Exporter for CsvExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Csv
    }

    fn export(&self, path: &Path, columns: &[String], rows: &[FlatRow]) -> Result<usize> {
        let batch = rows_to_batch(columns, rows)?;
        self.write_batch(path, &batch)?;
        info!("Wrote {} rows to {}", batch.num_rows(), path.display());
        Ok(batch.num_rows())
    }
}

// ============================================================================
// Parquet
// ============================================================================

/// Configuration for the Parquet exporter
#[derive(Debug, Clone)]
pub struct ParquetWriterConfig {
    compression: Compression,
    row_group_size: usize,
    dictionary_enabled: bool,
}

impl Default for ParquetWriterConfig {
    fn default() -> Self {
        Self {
            compression: Compression::SNAPPY,
            row_group_size: 1024 * 1024,
            dictionary_enabled: true,
        }
    }
}

impl ParquetWriterConfig {
    /// Create a new config with default settings
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set compression algorithm
    #[must_use]
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Set row group size
    #[must_use]
    pub fn with_row_group_size(mut self, size: usize) -> Self {
        self.row_group_size = size;
        self
    }

    /// Enable or disable dictionary encoding
    #[must_use]
    pub fn with_dictionary(mut self, enabled: bool) -> Self {
        self.dictionary_enabled = enabled;
        self
    }

    /// Get row group size
    #[must_use]
    pub fn row_group_size(&self) -> usize {
        self.row_group_size
    }

    fn build_properties(&self) -> WriterProperties {
        WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .set_dictionary_enabled(self.dictionary_enabled)
            .build()
    }
}

/// Parquet exporter
#[derive(Debug, Clone, Default)]
pub struct ParquetExporter {
    config: ParquetWriterConfig,
}

impl ParquetExporter {
    /// Create an exporter with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set writer configuration
    #[must_use]
    pub fn with_config(mut self, config: ParquetWriterConfig) -> Self {
        self.config = config;
        self
    }

    fn write_batch(&self, path: &Path, batch: &RecordBatch) -> Result<()> {
        let file = create_file(path)?;
        let props = self.config.build_properties();
        let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props)).map_err(|e| {
            Error::output(format!("Failed to create Parquet writer: {e}"))
        })?;
        writer
            .write(batch)
            .map_err(|e| Error::output(format!("Failed to write batch: {e}")))?;
        writer
            .close()
            .map_err(|e| Error::output(format!("Failed to close Parquet writer: {e}")))?;
        Ok(())
    }
}

impl Exporter for ParquetExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Parquet
    }

    fn export(&self, path: &Path, columns: &[String], rows: &[FlatRow]) -> Result<usize> {
        let batch = rows_to_batch(columns, rows)?;
        self.write_batch(path, &batch)?;
        info!("Wrote {} rows to {}", batch.num_rows(), path.display());
        Ok(batch.num_rows())
    }
}
