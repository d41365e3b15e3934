//! HTTP transport used by the download engine.
//!
//! The engine only reaches the network through the [`Transport`] trait.
//! [`HttpClient`] is the production implementation: a cheap, cloneable
//! wrapper over one pooled `reqwest::Client`, so every transfer of every
//! downloader sharing it reuses keep-alive connections per host.

use async_trait::async_trait;
use reqwest::{Client, Request, Response};
use tracing::{debug, instrument};

use super::config::{ConfigError, DownloaderConfig};
use super::constants::MAX_CONCURRENCY;
use crate::user_agent::default_user_agent;

/// Executes one HTTP request.
///
/// Implementations must be shareable across tasks; the engine calls `send`
/// from up to `workers` tasks at once.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `request` and returns the response once headers have arrived.
    ///
    /// # Errors
    ///
    /// Returns the transport error when no response could be obtained.
    async fn send(&self, request: Request) -> Result<Response, reqwest::Error>;
}

/// HTTP client for chunk transfers and producer discovery requests.
///
/// # Example
///
/// ```no_run
/// use chunkload_core::download::HttpClient;
///
/// let client = HttpClient::with_max_idle_per_host(16).unwrap();
/// let raw: &reqwest::Client = client.inner();
/// # let _ = raw;
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    /// Creates a client keeping up to [`MAX_CONCURRENCY`] idle connections per host.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails with the static configuration.
    /// This should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        Self::with_max_idle_per_host(MAX_CONCURRENCY)
            .expect("failed to build HTTP client with static configuration")
    }

    /// Creates a client keeping up to `max_idle` idle connections per host.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Client`] if the underlying client cannot be built
    /// (e.g. no TLS backend available).
    #[instrument(level = "debug")]
    pub fn with_max_idle_per_host(max_idle: usize) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .pool_max_idle_per_host(max_idle)
            .user_agent(default_user_agent())
            .build()
            .map_err(ConfigError::Client)?;
        debug!(max_idle, "built HTTP client");
        Ok(Self { client })
    }

    /// Creates a client from a validated [`DownloaderConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the config is invalid or the client cannot be built.
    pub fn from_config(config: &DownloaderConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Self::with_max_idle_per_host(config.max_idle_per_host)
    }

    /// Returns a reference to the underlying reqwest client.
    ///
    /// Producers use it for their discovery requests so that discovery and
    /// transfers share one connection pool.
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl Transport for HttpClient {
    async fn send(&self, request: Request) -> Result<Response, reqwest::Error> {
        self.client.execute(request).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_client_from_default_config() {
        assert!(HttpClient::from_config(&DownloaderConfig::default()).is_ok());
    }

    #[test]
    fn test_client_from_invalid_config_fails() {
        let config = DownloaderConfig {
            max_idle_per_host: MAX_CONCURRENCY + 1,
            ..DownloaderConfig::default()
        };
        assert!(matches!(
            HttpClient::from_config(&config),
            Err(ConfigError::InvalidValue { .. })
        ));
    }
}
