//! reqwest-backed [`HttpClient`].

use endpoint_store_core::environment::HttpClient;
use endpoint_store_core::error::FetchError;
use reqwest::Client;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Environment variable overriding [`HttpConfig::timeout`] (whole seconds)
pub const TIMEOUT_ENV: &str = "ENDPOINT_STORE_HTTP_TIMEOUT_SECS";

/// Environment variable overriding [`HttpConfig::user_agent`]
pub const USER_AGENT_ENV: &str = "ENDPOINT_STORE_USER_AGENT";

/// Settings for [`ReqwestClient`]
///
/// # Example
///
/// ```
/// use endpoint_store_runtime::HttpConfig;
/// use std::time::Duration;
///
/// let config = HttpConfig::default().with_timeout(Duration::from_secs(5));
/// assert_eq!(config.timeout, Duration::from_secs(5));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpConfig {
    /// Per-request timeout, connect included
    pub timeout: Duration,
    /// `User-Agent` header sent with every request
    pub user_agent: String,
}

impl HttpConfig {
    /// Set the request timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Defaults overridden by [`TIMEOUT_ENV`] and [`USER_AGENT_ENV`].
    ///
    /// Unparseable values are logged and ignored.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(raw) = std::env::var(TIMEOUT_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(secs) => config.timeout = Duration::from_secs(secs),
                Err(e) => tracing::warn!(value = %raw, error = %e, "Ignoring invalid {TIMEOUT_ENV}"),
            }
        }
        if let Ok(user_agent) = std::env::var(USER_AGENT_ENV) {
            config.user_agent = user_agent;
        }

        config
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: concat!("endpoint-store/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Production [`HttpClient`]: plain GET, JSON body.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: Client,
}

impl ReqwestClient {
    /// Build a client from `config`
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Request`] if the TLS backend cannot be initialised.
    pub fn new(config: &HttpConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| FetchError::Request(e.to_string()))?;

        Ok(Self { client })
    }

    /// Wrap an already configured reqwest client
    #[must_use]
    pub const fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn fetch(&self, url: &str) -> Result<Value, FetchError> {
        tracing::debug!(%url, "GET");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))
    }
}

impl HttpClient for ReqwestClient {
    fn get_json<'a>(
        &'a self,
        url: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Value, FetchError>> + Send + 'a>> {
        Box::pin(self.fetch(url))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HttpConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.user_agent.starts_with("endpoint-store/"));
    }

    #[test]
    fn test_config_setters() {
        let config = HttpConfig::default()
            .with_timeout(Duration::from_secs(2))
            .with_user_agent("demo/1.0");
        assert_eq!(config.timeout, Duration::from_secs(2));
        assert_eq!(config.user_agent, "demo/1.0");
    }

    #[test]
    fn test_client_creation() {
        assert!(ReqwestClient::new(&HttpConfig::default()).is_ok());
    }
}
