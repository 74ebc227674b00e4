//! Row to RecordBatch conversion

use crate::error::{Error, Result};
use crate::flatten::FlatRow;
use arrow::array::{ArrayRef, StringArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use std::sync::Arc;

/// Schema with one non-nullable `Utf8` field per column
pub fn schema_for(columns: &[String]) -> SchemaRef {
    let fields: Vec<Field> = columns
        .iter()
        .map(|name| Field::new(name, DataType::Utf8, false))
        .collect();
    Arc::new(Schema::new(fields))
}

/// Build a batch from flattened rows
///
/// Every row must carry exactly one cell per column.
pub fn rows_to_batch(columns: &[String], rows: &[FlatRow]) -> Result<RecordBatch> {
    if let Some((index, row)) = rows
        .iter()
        .enumerate()
        .find(|(_, row)| row.len() != columns.len())
    {
        return Err(Error::output(format!(
            "Row {index} has {} cells, expected {}",
            row.len(),
            columns.len()
        )));
    }

    let arrays: Vec<ArrayRef> = (0..columns.len())
        .map(|col| {
            let values: Vec<&str> = rows
                .iter()
                .map(|row| row.get(col).unwrap_or_default())
                .collect();
            Arc::new(StringArray::from(values)) as ArrayRef
        })
        .collect();

    let options = RecordBatchOptions::new().with_row_count(Some(rows.len()));
    Ok(RecordBatch::try_new_with_options(
        schema_for(columns),
        arrays,
        &options,
    )?)
}
