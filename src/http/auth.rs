//! API key authentication
//!
//! The GovInfo API accepts its key either as the `api_key` query parameter
//! or as an `X-Api-Key` header.

use crate::error::{Error, Result};
use reqwest::RequestBuilder;
use serde::{Deserialize, Serialize};

/// Default query parameter carrying the key
pub const DEFAULT_QUERY_PARAM: &str = "api_key";

/// Default header carrying the key
pub const DEFAULT_HEADER_NAME: &str = "X-Api-Key";

/// Location for API key placement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    /// Place in HTTP header
    Header,
    /// Place in query parameter
    #[default]
    Query,
}

/// API key attached to every outbound request
#[derive(Clone)]
pub struct ApiKey {
    value: String,
    location: Location,
    name: String,
}

impl ApiKey {
    /// Create a query-parameter API key
    ///
    /// An empty (or all-whitespace) key is a configuration error.
    pub fn new(value: impl Into<String>) -> Result<Self> {
        Self::with_location(value, Location::Query)
    }

    /// Create an API key placed at the given location
    pub fn with_location(value: impl Into<String>, location: Location) -> Result<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(Error::config("API key must not be empty"));
        }

        let name = match location {
            Location::Header => DEFAULT_HEADER_NAME,
            Location::Query => DEFAULT_QUERY_PARAM,
        };

        Ok(Self {
            value,
            location,
            name: name.to_string(),
        })
    }

    /// Override the header or query parameter name
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Where the key is placed
    pub fn location(&self) -> Location {
        self.location
    }

    /// Header or query parameter name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Apply the key to a request
    pub fn apply(&self, req: RequestBuilder) -> RequestBuilder {
        match self.location {
            Location::Header => req.header(self.name.as_str(), self.value.as_str()),
            Location::Query => req.query(&[(self.name.as_str(), self.value.as_str())]),
        }
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKey")
            .field("location", &self.location)
            .field("name", &self.name)
            .field("value", &"<redacted>")
            .finish()
    }
}
