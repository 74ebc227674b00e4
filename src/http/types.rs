//! Fetch outcome types
//!
//! A single GET never fails with `Err` for network or server trouble; it
//! produces a classified [`FetchOutcome`] and leaves the retry decision to
//! the caller.

use crate::error::is_retryable_status;
use serde_json::Value;
use std::time::Duration;

/// Classification of a failed fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Connection refused, reset, DNS failure, body read failure
    Network,
    /// Request exceeded its timeout
    Timeout,
    /// Server answered with a non-success status
    HttpStatus(u16),
    /// Body was not the JSON shape we expected
    Decode,
}

impl FailureKind {
    /// Whether a retry can reasonably succeed
    pub fn is_transient(self) -> bool {
        match self {
            FailureKind::Network | FailureKind::Timeout | FailureKind::Decode => true,
            FailureKind::HttpStatus(status) => is_retryable_status(status),
        }
    }

    /// HTTP status, if the server answered
    pub fn status(self) -> Option<u16> {
        match self {
            FailureKind::HttpStatus(status) => Some(status),
            _ => None,
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::HttpStatus(status) => write!(f, "HTTP {status}"),
            FailureKind::Decode => write!(f, "decode error"),
        }
    }
}

/// A classified failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    /// What went wrong
    pub kind: FailureKind,
    /// Human readable detail (response body, transport message)
    pub detail: String,
    /// Server-requested delay from a `Retry-After` header
    pub retry_after: Option<Duration>,
}

impl FetchFailure {
    /// Create a failure without a retry hint
    pub fn new(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
            retry_after: None,
        }
    }

    /// Create a decode failure
    pub fn decode(detail: impl Into<String>) -> Self {
        Self::new(FailureKind::Decode, detail)
    }

    /// Attach a retry hint
    #[must_use]
    pub fn with_retry_after(mut self, retry_after: Option<Duration>) -> Self {
        self.retry_after = retry_after;
        self
    }

    /// Whether a retry can reasonably succeed
    pub fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }
}

impl std::fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.detail.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}: {}", self.kind, self.detail)
        }
    }
}

/// Result of one GET
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// 2xx with a parsed JSON body
    Success {
        /// HTTP status
        status: u16,
        /// Parsed body
        body: Value,
    },
    /// Anything else
    Failure(FetchFailure),
}
