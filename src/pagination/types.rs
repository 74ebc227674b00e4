//! Pagination types
//!
//! Defines the walk state machine, the request that starts a walk, and the
//! parsed shape of one page.

use crate::http::FetchFailure;
use crate::types::{JsonObject, JsonValue};
use chrono::{DateTime, SecondsFormat, Utc};
use tracing::warn;

/// Query parameter carrying the continuation token
pub const DEFAULT_TOKEN_PARAM: &str = "offsetMark";

/// Token requesting the first page
pub const INITIAL_TOKEN: &str = "*";

/// Query parameter carrying the page size
pub const DEFAULT_PAGE_SIZE_PARAM: &str = "pageSize";

/// Response key holding the page's records
pub const DEFAULT_RECORDS_KEY: &str = "packages";

/// Response key holding the next page link
pub const NEXT_PAGE_KEY: &str = "nextPage";

/// Response key holding the record count
pub const COUNT_KEY: &str = "count";

/// Default records per page
pub const DEFAULT_PAGE_SIZE: u32 = 100;

// ============================================================================
// Walk State
// ============================================================================

/// Where a page walk stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WalkState {
    /// First page pending, or a continuation token is in hand
    #[default]
    Continuing,
    /// No further token, or the item cap was reached
    Exhausted,
    /// Unrecoverable error; accumulated rows were discarded
    Aborted,
}

impl WalkState {
    /// Check if the walk has finished, successfully or not
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Continuing)
    }
}

// ============================================================================
// Date Window
// ============================================================================

/// Last-modified window a walk is restricted to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateWindow {
    /// Inclusive lower bound
    pub start: Option<DateTime<Utc>>,
    /// Inclusive upper bound
    pub end: Option<DateTime<Utc>>,
}

impl DateWindow {
    /// Create a window between two instants
    pub fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        Self { start, end }
    }

    /// Window with no bounds
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Path segments for the collections endpoint
    ///
    /// The endpoint requires a start bound whenever any bound is given, so a
    /// missing start falls back to the Unix epoch.
    pub fn path_segments(&self) -> Vec<String> {
        let start = self.start.unwrap_or_default();
        let mut segments = vec![format_timestamp(&start)];
        if let Some(end) = &self.end {
            segments.push(format_timestamp(end));
        }
        segments
    }
}

/// ISO-8601 UTC with a `Z` suffix and whole seconds
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

// ============================================================================
// Walk Request
// ============================================================================

/// Everything needed to start a walk over one collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkRequest {
    /// Collection code (e.g. `BILLS`)
    pub collection: String,
    /// Last-modified window
    pub window: DateWindow,
    /// Records requested per page
    pub page_size: u32,
    /// Stop after this many rows
    pub max_items: Option<usize>,
}

impl WalkRequest {
    /// Create a request with the default page size and no cap
    pub fn new(collection: impl Into<String>, window: DateWindow) -> Self {
        Self {
            collection: collection.into(),
            window,
            page_size: DEFAULT_PAGE_SIZE,
            max_items: None,
        }
    }

    /// Set the page size
    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set the item cap
    #[must_use]
    pub fn with_max_items(mut self, max_items: Option<usize>) -> Self {
        self.max_items = max_items;
        self
    }

    /// Endpoint path: `/collections/{code}/{start}[/{end}]`
    pub fn path(&self) -> String {
        let mut path = format!("/collections/{}", self.collection);
        for segment in self.window.path_segments() {
            path.push('/');
            path.push_str(&segment);
        }
        path
    }
}

// ============================================================================
// Page
// ============================================================================

/// One parsed response of the collections endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// Record count reported by the server
    pub count: u64,
    /// Records in response order
    pub records: Vec<JsonObject>,
    /// Continuation token; `None` ends the walk
    pub next_token: Option<String>,
}

impl Page {
    /// Parse a response body
    ///
    /// A body without `count` or the records key is a decode failure, which
    /// the walker retries like any other transient error.
    pub fn from_json(
        body: JsonValue,
        records_key: &str,
        token_param: &str,
    ) -> Result<Self, FetchFailure> {
        let JsonValue::Object(mut obj) = body else {
            return Err(FetchFailure::decode("response body is not a JSON object"));
        };

        let count = obj
            .get(COUNT_KEY)
            .and_then(parse_count)
            .ok_or_else(|| FetchFailure::decode(format!("response is missing '{COUNT_KEY}'")))?;

        let records = match obj.remove(records_key) {
            Some(JsonValue::Array(items)) => {
                let total = items.len();
                let records: Vec<JsonObject> = items
                    .into_iter()
                    .filter_map(|item| match item {
                        JsonValue::Object(record) => Some(record),
                        _ => None,
                    })
                    .collect();
                if records.len() < total {
                    warn!(
                        "Skipped {} non-object entries under '{records_key}'",
                        total - records.len()
                    );
                }
                records
            }
            Some(JsonValue::Null) if count == 0 => Vec::new(),
            Some(_) => {
                return Err(FetchFailure::decode(format!(
                    "'{records_key}' is not an array"
                )))
            }
            None => {
                return Err(FetchFailure::decode(format!(
                    "response is missing '{records_key}'"
                )))
            }
        };

        let next_token = obj
            .get(NEXT_PAGE_KEY)
            .and_then(JsonValue::as_str)
            .and_then(|link| extract_token(link, token_param));

        Ok(Self {
            count,
            records,
            next_token,
        })
    }

    /// Records this page may contribute: never more than its `count`
    pub fn usable_len(&self) -> usize {
        usize::try_from(self.count).map_or(self.records.len(), |c| c.min(self.records.len()))
    }
}

fn parse_count(value: &JsonValue) -> Option<u64> {
    match value {
        JsonValue::Number(n) => n.as_u64(),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Pull the continuation token out of a `nextPage` link
///
/// A link carrying `token_param` yields that parameter's value; any other
/// non-empty string is taken as the token itself.
pub fn extract_token(link: &str, token_param: &str) -> Option<String> {
    let link = link.trim();
    if link.is_empty() {
        return None;
    }

    let token = url::Url::parse(link)
        .ok()
        .and_then(|url| {
            url.query_pairs()
                .find(|(key, _)| key == token_param)
                .map(|(_, value)| value.into_owned())
        })
        .unwrap_or_else(|| link.to_string());

    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}
