//! Page walker
//!
//! Follows continuation tokens from the first page until the server stops
//! handing them out or the caller's item cap is reached. Transient failures
//! are retried per page; anything unrecoverable aborts the walk and the rows
//! gathered so far are dropped. A continuation token that was already sent
//! during the walk means the server is cycling, which also aborts.

use super::retry::{fetch_with_retry, Retried, RetryPolicy};
use super::types::{
    Page, WalkRequest, WalkState, DEFAULT_PAGE_SIZE_PARAM, DEFAULT_RECORDS_KEY,
    DEFAULT_TOKEN_PARAM, INITIAL_TOKEN,
};
use crate::error::{Error, Result};
use crate::flatten::{FlatRow, RecordFlattener};
use crate::http::{HttpClient, RequestConfig};
use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Wire-level knobs of the walk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkerConfig {
    /// Response key holding records
    pub records_key: String,
    /// Query parameter carrying the continuation token
    pub token_param: String,
    /// Query parameter carrying the page size
    pub page_size_param: String,
    /// Token sent with the first request
    pub initial_token: String,
    /// Retry policy applied to every page
    pub retry: RetryPolicy,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            records_key: DEFAULT_RECORDS_KEY.to_string(),
            token_param: DEFAULT_TOKEN_PARAM.to_string(),
            page_size_param: DEFAULT_PAGE_SIZE_PARAM.to_string(),
            initial_token: INITIAL_TOKEN.to_string(),
            retry: RetryPolicy::default(),
        }
    }
}

impl WalkerConfig {
    /// Create a config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the records key
    #[must_use]
    pub fn with_records_key(mut self, key: impl Into<String>) -> Self {
        self.records_key = key.into();
        self
    }

    /// Set the retry policy
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Statistics from one walk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkStats {
    /// Pages successfully fetched
    pub pages_fetched: usize,
    /// Retries spent across all pages
    pub retries: u32,
    /// Sum of `count` over fetched pages
    pub reported_count: u64,
    /// Records dropped because their identity was already seen
    pub duplicates_skipped: usize,
    /// Whether the item cap cut the walk short
    pub capped: bool,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

/// Rows and statistics of a walk that ended `Exhausted`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkOutcome {
    /// Flattened rows in server order
    pub rows: Vec<FlatRow>,
    /// Statistics
    pub stats: WalkStats,
}

/// Drives a cursor walk over one collection
pub struct PageWalker<'a> {
    client: &'a HttpClient,
    flattener: &'a dyn RecordFlattener,
    config: WalkerConfig,
    state: WalkState,
}

impl<'a> PageWalker<'a> {
    /// Create a walker with the default config
    pub fn new(client: &'a HttpClient, flattener: &'a dyn RecordFlattener) -> Self {
        Self {
            client,
            flattener,
            config: WalkerConfig::default(),
            state: WalkState::Continuing,
        }
    }

    /// Set walker configuration
    #[must_use]
    pub fn with_config(mut self, config: WalkerConfig) -> Self {
        self.config = config;
        self
    }

    /// State the last walk ended in (`Continuing` before any walk)
    pub fn state(&self) -> WalkState {
        self.state
    }

    /// Walk every page of `request`
    ///
    /// Returns rows only when the walk ends `Exhausted`. On `Aborted` the
    /// error names the failing page and nothing gathered so far escapes.
    pub async fn walk(&mut self, request: &WalkRequest) -> Result<WalkOutcome> {
        let start = Instant::now();
        self.state = WalkState::Continuing;

        let mut rows = Vec::new();
        let mut seen = HashSet::new();
        let mut stats = WalkStats::default();

        if request.max_items == Some(0) {
            self.state = WalkState::Exhausted;
            stats.capped = true;
            return Ok(WalkOutcome { rows, stats });
        }

        let path = request.path();
        let page_size = request.page_size.to_string();
        let mut token = self.config.initial_token.clone();
        let mut sent_tokens = HashSet::from([token.clone()]);
        let mut page_index = 0;

        while self.state == WalkState::Continuing {
            let req = RequestConfig::new()
                .query(&self.config.page_size_param, &page_size)
                .query(&self.config.token_param, &token);

            let records_key = self.config.records_key.as_str();
            let token_param = self.config.token_param.as_str();
            let fetched = fetch_with_retry(
                self.client,
                &path,
                &req,
                &self.config.retry,
                page_index,
                |body| Page::from_json(body, records_key, token_param),
            )
            .await;

            let Retried {
                value: page,
                retries,
            } = match fetched {
                Ok(fetched) => fetched,
                Err(e) => {
                    self.state = WalkState::Aborted;
                    warn!(
                        "Walk over {} aborted on page {page_index}, discarding {} rows: {e}",
                        request.collection,
                        rows.len()
                    );
                    return Err(e);
                }
            };

            stats.pages_fetched += 1;
            stats.retries += retries;
            stats.reported_count += page.count;

            let added = self.accumulate(&page, request.max_items, &mut rows, &mut seen, &mut stats);
            debug!(
                "Page {page_index}: {added} rows ({} total, count {})",
                rows.len(),
                page.count
            );

            let cap_reached = request.max_items.is_some_and(|max| rows.len() >= max);
            match page.next_token {
                _ if cap_reached => {
                    stats.capped = true;
                    self.state = WalkState::Exhausted;
                }
                Some(next) if sent_tokens.contains(&next) => {
                    self.state = WalkState::Aborted;
                    warn!(
                        "Walk over {} aborted on page {page_index}: token {next} was already sent, discarding {} rows",
                        request.collection,
                        rows.len()
                    );
                    return Err(Error::PaginationLoop {
                        page: page_index,
                        token: next,
                    });
                }
                Some(next) => {
                    sent_tokens.insert(next.clone());
                    token = next;
                }
                None => self.state = WalkState::Exhausted,
            }

            page_index += 1;
        }

        stats.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Walk over {} finished: {} rows in {} pages ({} retries)",
            request.collection,
            rows.len(),
            stats.pages_fetched,
            stats.retries
        );

        Ok(WalkOutcome { rows, stats })
    }

    /// Append a page's records, honoring `count`, identity, and the cap
    fn accumulate(
        &self,
        page: &Page,
        max_items: Option<usize>,
        rows: &mut Vec<FlatRow>,
        seen: &mut HashSet<String>,
        stats: &mut WalkStats,
    ) -> usize {
        let before = rows.len();

        for record in page.records.iter().take(page.usable_len()) {
            if max_items.is_some_and(|max| rows.len() >= max) {
                break;
            }
            if let Some(id) = self.flattener.identity(record) {
                if !seen.insert(id) {
                    stats.duplicates_skipped += 1;
                    continue;
                }
            }
            rows.push(self.flattener.flatten(record));
        }

        rows.len() - before
    }
}

impl std::fmt::Debug for PageWalker<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageWalker")
            .field("config", &self.config)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
