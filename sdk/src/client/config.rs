//! Where and how the API layer reaches the console's REST API.

use std::time::Duration;

use reqwest::Url;

use super::error::ClientError;

/// Default base URL for the API.
pub const DEFAULT_BASE_URL: &str = "https://api.wms.example/v1";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default retries for rate-limited or timed-out calls.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// API layer configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API root; request paths are joined onto it.
    pub base_url: String,

    /// Per-request timeout.
    pub timeout: Duration,

    /// Retries for rate-limited or timed-out calls.
    pub max_retries: u32,

    /// User agent sent with every request.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            user_agent: format!("wmsync-sdk/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ClientConfig {
    /// Configuration for the API rooted at `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the retry count.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Full URL of `path`. The base may end in a version segment such as
    /// `/v1`, which is kept; slashes at the seam are collapsed.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Checks the base URL and timeout.
    ///
    /// # Errors
    ///
    /// [`ClientError::InvalidConfig`] unless the base URL is an absolute
    /// http(s) URL with a host and without query or fragment, and the
    /// timeout is non-zero.
    pub fn validate(&self) -> Result<(), ClientError> {
        let url = Url::parse(&self.base_url).map_err(|e| {
            ClientError::InvalidConfig(format!("base_url {:?}: {}", self.base_url, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ClientError::InvalidConfig(format!(
                "base_url must be http or https, got {}",
                url.scheme()
            )));
        }
        if url.host_str().is_none() {
            return Err(ClientError::InvalidConfig("base_url has no host".to_string()));
        }
        if url.query().is_some() || url.fragment().is_some() {
            return Err(ClientError::InvalidConfig(
                "base_url cannot carry a query or fragment".to_string(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(ClientError::InvalidConfig(
                "timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
