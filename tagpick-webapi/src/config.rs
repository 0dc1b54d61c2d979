//! Transport configuration

use crate::error::{WebApiError, WebApiResult};
use std::time::Duration;
use url::Url;

/// Default relative path of the OData data endpoint
pub const DEFAULT_DATA_PATH: &str = "/api/data/v9.1";

/// Default relative path of the full-text search endpoint
pub const DEFAULT_SEARCH_PATH: &str = "/api/search/v2.0/query";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection settings for one store instance
#[derive(Debug, Clone)]
pub struct WebApiConfig {
    base_url: Url,
    /// Path prefix of the data endpoint, under the base URL
    pub data_path: String,
    /// Path of the search endpoint, under the base URL
    pub search_path: String,
    /// Request timeout applied to every call
    pub timeout: Duration,
    /// User agent sent with every call
    pub user_agent: String,
}

impl WebApiConfig {
    /// Validate and normalize the store's base URL
    pub fn new(base_url: &str) -> WebApiResult<Self> {
        let parsed = Url::parse(base_url)
            .map_err(|e| WebApiError::InvalidBaseUrl(format!("{base_url}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(WebApiError::InvalidBaseUrl(format!(
                "{base_url}: unsupported scheme '{}'",
                parsed.scheme()
            )));
        }
        Ok(Self {
            base_url: parsed,
            data_path: DEFAULT_DATA_PATH.to_string(),
            search_path: DEFAULT_SEARCH_PATH.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: format!("tagpick-webapi/{}", env!("CARGO_PKG_VERSION")),
        })
    }

    pub fn with_data_path(mut self, path: impl Into<String>) -> Self {
        self.data_path = path.into();
        self
    }

    pub fn with_search_path(mut self, path: impl Into<String>) -> Self {
        self.search_path = path.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// The base URL without a trailing slash
    pub fn base(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    /// Absolute URL of a resource under the data endpoint
    pub(crate) fn data_url(&self, resource: &str) -> String {
        format!("{}{}/{}", self.base(), self.data_path, resource)
    }

    /// Absolute URL of the search endpoint
    pub(crate) fn search_url(&self) -> String {
        format!("{}{}", self.base(), self.search_path)
    }
}
