//! Flattener implementations

use super::types::{FlatRow, RecordFlattener, PLACEHOLDER};
use crate::types::{JsonObject, JsonValue};

/// Columns of a GovInfo package summary, as returned by the collections
/// endpoint
pub const PACKAGE_COLUMNS: &[&str] = &[
    "packageId",
    "lastModified",
    "packageLink",
    "docClass",
    "title",
    "congress",
    "dateIssued",
];

/// Identity field of a package summary
pub const PACKAGE_IDENTITY: &str = "packageId";

// ============================================================================
// Column Flattener
// ============================================================================

/// Fixed-column flattener
///
/// A column name is first looked up as a literal key; failing that, a dotted
/// name descends into nested objects (`download.pdfLink`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnFlattener {
    columns: Vec<String>,
    identity_field: Option<String>,
}

impl ColumnFlattener {
    /// Create a flattener over the given columns, with no identity field
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            identity_field: None,
        }
    }

    /// Flattener for package summaries, deduplicating on `packageId`
    pub fn packages() -> Self {
        Self::new(PACKAGE_COLUMNS.iter().copied()).with_identity(PACKAGE_IDENTITY)
    }

    /// Set the field used to detect repeated records
    #[must_use]
    pub fn with_identity(mut self, field: impl Into<String>) -> Self {
        self.identity_field = Some(field.into());
        self
    }

    /// The identity field, if any
    pub fn identity_field(&self) -> Option<&str> {
        self.identity_field.as_deref()
    }
}

impl Default for ColumnFlattener {
    fn default() -> Self {
        Self::packages()
    }
}

impl RecordFlattener for ColumnFlattener {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn flatten(&self, record: &JsonObject) -> FlatRow {
        let cells = self
            .columns
            .iter()
            .map(|column| {
                lookup(record, column).map_or_else(|| PLACEHOLDER.to_string(), value_to_cell)
            })
            .collect();
        FlatRow::new(cells)
    }

    fn identity(&self, record: &JsonObject) -> Option<String> {
        let field = self.identity_field.as_deref()?;
        let value = lookup(record, field)?;
        let cell = value_to_cell(value);
        if cell.is_empty() {
            None
        } else {
            Some(cell)
        }
    }
}

/// Render one JSON value as a cell
///
/// Scalars render bare, null renders as the placeholder, arrays and objects
/// render as compact JSON.
pub fn value_to_cell(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => PLACEHOLDER.to_string(),
        JsonValue::String(s) => s.clone(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::Array(_) | JsonValue::Object(_) => value.to_string(),
    }
}

fn lookup<'a>(record: &'a JsonObject, column: &str) -> Option<&'a JsonValue> {
    if let Some(value) = record.get(column) {
        return Some(value);
    }

    let mut parts = column.split('.');
    let mut current = record.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}
