//! Scraper configuration
//!
//! Settings come from three layers, later ones winning: built-in defaults,
//! an optional YAML file, then `GOVINFO_*` environment variables.
//!
//! ```yaml
//! base_url: https://api.govinfo.gov
//! output_dir: scraped_data
//! page_size: 100
//! min_interval_ms: 100
//! retry:
//!   max_attempts: 3
//!   backoff_type: exponential
//! format: csv
//! ```

use crate::error::{Error, Result, ResultExt};
use crate::flatten::{ColumnFlattener, PACKAGE_COLUMNS, PACKAGE_IDENTITY};
use crate::http::{ApiKey, HttpClient, HttpClientConfig, RateLimiterConfig};
use crate::pagination::{RetryPolicy, WalkerConfig, DEFAULT_PAGE_SIZE, DEFAULT_RECORDS_KEY};
use crate::types::{BackoffType, ExportFormat, OptionStringExt};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable holding the API key
pub const API_KEY_ENV: &str = "GOVINFO_API_KEY";

/// Environment variable overriding the base URL
pub const BASE_URL_ENV: &str = "GOVINFO_BASE_URL";

/// Environment variable overriding the output directory
pub const OUTPUT_DIR_ENV: &str = "GOVINFO_OUTPUT_DIR";

/// Production API root
pub const DEFAULT_BASE_URL: &str = "https://api.govinfo.gov";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Complete scraper configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    /// API root all paths are resolved against
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key; usually supplied through the environment
    #[serde(default)]
    pub api_key: Option<String>,

    /// Directory export files land in
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Records requested per page
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Minimum spacing between requests in milliseconds
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retry configuration
    #[serde(default)]
    pub retry: RetryConfig,

    /// Response key holding records
    #[serde(default = "default_records_key")]
    pub records_key: String,

    /// Field used to drop repeated records
    #[serde(default = "default_identity_field")]
    pub identity_field: String,

    /// Column override; package summary columns when absent
    #[serde(default)]
    pub columns: Option<Vec<String>>,

    /// Export format
    #[serde(default)]
    pub format: ExportFormat,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            output_dir: default_output_dir(),
            page_size: default_page_size(),
            min_interval_ms: default_min_interval_ms(),
            timeout_secs: default_timeout_secs(),
            retry: RetryConfig::default(),
            records_key: default_records_key(),
            identity_field: default_identity_field(),
            columns: None,
            format: ExportFormat::default(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("scraped_data")
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_min_interval_ms() -> u64 {
    100
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_records_key() -> String {
    DEFAULT_RECORDS_KEY.to_string()
}

fn default_identity_field() -> String {
    PACKAGE_IDENTITY.to_string()
}

// ============================================================================
// Retry Config
// ============================================================================

/// Retry configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per page, first one included
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Upper bound for any delay in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Type of backoff
    #[serde(default)]
    pub backoff_type: BackoffType,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            backoff_type: BackoffType::Exponential,
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    500
}

fn default_max_backoff_ms() -> u64 {
    30_000
}

impl RetryConfig {
    /// Convert to the policy the walker runs with
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts).with_backoff(
            self.backoff_type,
            Duration::from_millis(self.initial_backoff_ms),
            Duration::from_millis(self.max_backoff_ms),
        )
    }
}

// ============================================================================
// Loading
// ============================================================================

impl ScraperConfig {
    /// Parse a YAML document; missing fields take their defaults
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Read and parse a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound {
                path: path.display().to_string(),
            });
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_yaml_str(&content)
            .map_err(|e| Error::config(format!("Failed to parse {}: {e}", path.display())))
    }

    /// Defaults or `path`, then the process environment, then validation
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        let config = config.with_env();
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from the process environment
    #[must_use]
    pub fn with_env(self) -> Self {
        self.with_env_from(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup
    #[must_use]
    pub fn with_env_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).none_if_empty();

        if let Some(key) = var(API_KEY_ENV) {
            self.api_key = Some(key);
        }
        if let Some(url) = var(BASE_URL_ENV) {
            self.base_url = url;
        }
        if let Some(dir) = var(OUTPUT_DIR_ENV) {
            self.output_dir = PathBuf::from(dir);
        }
        self
    }

    /// Check the configuration is usable
    pub fn validate(&self) -> Result<()> {
        if self.api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
            return Err(Error::config(format!(
                "API key missing: set {API_KEY_ENV} or api_key in the config file"
            )));
        }

        url::Url::parse(&self.base_url)
            .map_err(|e| Error::invalid_value("base_url", e.to_string()))?;

        if self.page_size == 0 {
            return Err(Error::invalid_value("page_size", "must be at least 1"));
        }

        if self.retry.max_attempts == 0 {
            return Err(Error::invalid_value("retry.max_attempts", "must be at least 1"));
        }

        if self.records_key.trim().is_empty() {
            return Err(Error::missing_field("records_key"));
        }

        if let Some(columns) = &self.columns {
            if columns.is_empty() {
                return Err(Error::invalid_value("columns", "cannot be empty"));
            }
            if let Some(blank) = columns.iter().position(|c| c.trim().is_empty()) {
                return Err(Error::invalid_value(
                    "columns",
                    format!("column {blank} has an empty name"),
                ));
            }
        }

        Ok(())
    }

    // ========================================================================
    // Component Builders
    // ========================================================================

    /// API key credential
    pub fn api_key(&self) -> Result<ApiKey> {
        ApiKey::new(self.api_key.clone().unwrap_or_default())
    }

    /// HTTP client settings
    pub fn http_client_config(&self) -> HttpClientConfig {
        HttpClientConfig::builder()
            .base_url(self.base_url.clone())
            .timeout(Duration::from_secs(self.timeout_secs))
            .rate_limit(RateLimiterConfig::from_millis(self.min_interval_ms))
            .build()
    }

    /// Authenticated, rate-limited HTTP client
    pub fn http_client(&self) -> Result<HttpClient> {
        HttpClient::new(self.http_client_config(), self.api_key()?)
    }

    /// Retry policy shared by listing and walking
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry.to_policy()
    }

    /// Walker wire settings
    pub fn walker_config(&self) -> WalkerConfig {
        WalkerConfig::new()
            .with_records_key(self.records_key.clone())
            .with_retry(self.retry_policy())
    }

    /// Flattener over the configured columns
    pub fn flattener(&self) -> ColumnFlattener {
        let flattener = match &self.columns {
            Some(columns) => ColumnFlattener::new(columns.iter().cloned()),
            None => ColumnFlattener::new(PACKAGE_COLUMNS.iter().copied()),
        };
        match self.identity_field.trim() {
            "" => flattener,
            field => flattener.with_identity(field),
        }
    }
}

impl std::fmt::Debug for ScraperConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScraperConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("output_dir", &self.output_dir)
            .field("page_size", &self.page_size)
            .field("min_interval_ms", &self.min_interval_ms)
            .field("timeout_secs", &self.timeout_secs)
            .field("retry", &self.retry)
            .field("records_key", &self.records_key)
            .field("identity_field", &self.identity_field)
            .field("columns", &self.columns)
            .field("format", &self.format)
            .finish()
    }
}
