//! Flattener types and traits

use crate::types::JsonObject;

/// Cell value for a field the record does not carry
pub const PLACEHOLDER: &str = "";

/// One record projected onto a flattener's columns
///
/// Cells are positionally aligned with `RecordFlattener::columns`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FlatRow {
    cells: Vec<String>,
}

impl FlatRow {
    /// Create a row from its cells
    pub fn new(cells: Vec<String>) -> Self {
        Self { cells }
    }

    /// All cells in column order
    pub fn cells(&self) -> &[String] {
        &self.cells
    }

    /// Cell at a column index
    pub fn get(&self, index: usize) -> Option<&str> {
        self.cells.get(index).map(String::as_str)
    }

    /// Number of cells
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Check if the row has no cells
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Consume the row, returning its cells
    pub fn into_cells(self) -> Vec<String> {
        self.cells
    }
}

/// Core trait for record flatteners
///
/// Implementations must be pure: the same record always flattens to the
/// same row, and every row has exactly `columns().len()` cells.
pub trait RecordFlattener: Send + Sync {
    /// Column header, fixed for the lifetime of the flattener
    fn columns(&self) -> &[String];

    /// Project one record onto the columns
    fn flatten(&self, record: &JsonObject) -> FlatRow;

    /// Identity used to drop repeated records across pages
    ///
    /// `None` means the record is never treated as a duplicate.
    fn identity(&self, record: &JsonObject) -> Option<String>;
}
