//! Pagination module
//!
//! Walks the cursor-paginated collections endpoint.
//!
//! # Overview
//!
//! A walk starts with `offsetMark=*` and follows the token embedded in each
//! response's `nextPage` link. The walk is a three-state machine
//! (`Continuing` → `Exhausted` | `Aborted`); only `Exhausted` hands rows back.

mod retry;
mod types;
mod walker;

pub use retry::{fetch_with_retry, Retried, RetryPolicy};
pub use types::{
    extract_token, format_timestamp, DateWindow, Page, WalkRequest, WalkState,
    DEFAULT_PAGE_SIZE, DEFAULT_RECORDS_KEY, DEFAULT_TOKEN_PARAM, INITIAL_TOKEN,
};
pub use walker::{PageWalker, WalkOutcome, WalkStats, WalkerConfig};
