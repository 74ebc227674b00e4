//! Output module
//!
//! Turns flattened rows into an Arrow `RecordBatch` and writes it out.
//!
//! # Overview
//!
//! - [`rows_to_batch`] builds an all-`Utf8` batch from a header and rows
//! - [`CsvExporter`] writes the batch as CSV with a header row
//! - [`ParquetExporter`] writes the same batch as Parquet
//! - [`export_path`] names the output file after the collection and time

mod batch;
mod writer;

pub use batch::{rows_to_batch, schema_for};
pub use writer::{
    export_path, exporter_for, CsvExporter, Exporter, ParquetExporter, ParquetWriterConfig,
    TIMESTAMP_FORMAT,
};
