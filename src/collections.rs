//! Collection catalog
//!
//! Reference data about the collections the API exposes. The scraper only
//! needs to know whether a code exists; listing is exposed for the CLI.

use crate::error::Result;
use crate::http::{FetchFailure, HttpClient, RequestConfig};
use crate::pagination::{fetch_with_retry, RetryPolicy};
use crate::types::JsonValue;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

/// Listing endpoint
pub const COLLECTIONS_PATH: &str = "/collections";

/// One collection as returned by the listing endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    /// Short code (e.g. `BILLS`)
    pub collection_code: String,
    /// Human-readable label
    #[serde(default)]
    pub collection_name: String,
    /// Number of packages
    #[serde(default)]
    pub package_count: Option<u64>,
    /// Number of granules
    #[serde(default)]
    pub granule_count: Option<u64>,
    /// Last modification of any package in the collection
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub last_modified: Option<DateTime<Utc>>,
}

impl Collection {
    /// Create a collection entry
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            collection_code: code.into(),
            collection_name: name.into(),
            package_count: None,
            granule_count: None,
            last_modified: None,
        }
    }

    /// Check whether this entry answers to `code`
    pub fn matches(&self, code: &str) -> bool {
        self.collection_code.eq_ignore_ascii_case(code.trim())
    }
}

/// Unparseable timestamps become `None` rather than failing the listing
fn lenient_timestamp<'de, D>(deserializer: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| {
        DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|ts| ts.with_timezone(&Utc))
    }))
}

/// Parse the listing body
pub fn parse_collections(body: JsonValue) -> std::result::Result<Vec<Collection>, FetchFailure> {
    let JsonValue::Object(mut obj) = body else {
        return Err(FetchFailure::decode("response body is not a JSON object"));
    };
    let items = obj
        .remove("collections")
        .ok_or_else(|| FetchFailure::decode("response is missing 'collections'"))?;
    serde_json::from_value(items)
        .map_err(|e| FetchFailure::decode(format!("Failed to parse collections: {e}")))
}

/// Source of collection reference data
#[async_trait]
pub trait CollectionLookup: Send + Sync {
    /// All known collections
    async fn list_collections(&self) -> Result<Vec<Collection>>;

    /// Find a collection by code (case-insensitive)
    async fn find(&self, code: &str) -> Result<Option<Collection>> {
        let collections = self.list_collections().await?;
        Ok(collections.into_iter().find(|c| c.matches(code)))
    }
}

// ============================================================================
// API-backed catalog
// ============================================================================

/// Catalog backed by the listing endpoint, fetched once per process
pub struct ApiCollectionCatalog {
    client: Arc<HttpClient>,
    retry: RetryPolicy,
    cache: OnceCell<Vec<Collection>>,
}

impl ApiCollectionCatalog {
    /// Create a catalog using the given client
    pub fn new(client: Arc<HttpClient>) -> Self {
        Self {
            client,
            retry: RetryPolicy::default(),
            cache: OnceCell::new(),
        }
    }

    /// Set the retry policy for the listing request
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn fetch(&self) -> Result<Vec<Collection>> {
        let fetched = fetch_with_retry(
            &self.client,
            COLLECTIONS_PATH,
            &RequestConfig::new(),
            &self.retry,
            0,
            parse_collections,
        )
        .await?;
        info!("Fetched {} collections", fetched.value.len());
        Ok(fetched.value)
    }
}

#[async_trait]
impl CollectionLookup for ApiCollectionCatalog {
    async fn list_collections(&self) -> Result<Vec<Collection>> {
        self.cache
            .get_or_try_init(|| self.fetch())
            .await
            .map(Clone::clone)
    }
}

impl std::fmt::Debug for ApiCollectionCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiCollectionCatalog")
            .field("retry", &self.retry)
            .field("cached", &self.cache.initialized())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Static catalog
// ============================================================================

/// Fixed in-memory catalog
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    collections: Vec<Collection>,
}

impl StaticCatalog {
    /// Create a catalog from a list of collections
    pub fn new(collections: Vec<Collection>) -> Self {
        Self { collections }
    }

    /// Catalog with bare codes and no labels
    pub fn from_codes<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            codes
                .into_iter()
                .map(|code| Collection::new(code, ""))
                .collect(),
        )
    }
}

#[async_trait]
impl CollectionLookup for StaticCatalog {
    async fn list_collections(&self) -> Result<Vec<Collection>> {
        Ok(self.collections.clone())
    }
}
