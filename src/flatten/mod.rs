//! Record flattening module
//!
//! Projects heterogeneous API records onto a fixed column set so every row
//! of one export shares the same header.
//!
//! # Overview
//!
//! - `RecordFlattener` - trait implemented by every flattener
//! - `ColumnFlattener` - fixed column list, dotted paths into nested objects

mod flatteners;
mod types;

pub use flatteners::{value_to_cell, ColumnFlattener, PACKAGE_COLUMNS, PACKAGE_IDENTITY};
pub use types::{FlatRow, RecordFlattener, PLACEHOLDER};
