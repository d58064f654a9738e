//! HTTP client for the InfluxDB 1.x write endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use thiserror::Error;
use whisperflux_types::{PointWriter, Series};

use crate::{InfluxConfig, encode_series};

/// Errors that can occur while writing to InfluxDB.
#[derive(Error, Debug)]
pub enum WriteError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The configured server URL could not be parsed.
    #[error("invalid server URL '{url}': {message}")]
    InvalidUrl {
        /// The rejected URL.
        url: String,
        /// Parser message.
        message: String,
    },

    /// Server rejected the write.
    #[error("server error {status}: {message}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Message reported by the server.
        message: String,
    },
}

/// Writes series to InfluxDB with a pooled HTTP client.
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct InfluxWriter {
    client: Client,
    endpoint: Url,
    config: InfluxConfig,
}

impl InfluxWriter {
    /// Creates a new writer with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the HTTP client cannot be
    /// created.
    pub fn new(config: InfluxConfig) -> Result<Self, WriteError> {
        let endpoint = write_endpoint(&config.url)?;
        let client = Client::builder()
            .pool_max_idle_per_host(config.pool_size)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_nodelay(true)
            .tcp_keepalive(Duration::from_secs(60))
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(&config.user_agent)
            .build()?;
        Ok(Self {
            client,
            endpoint,
            config,
        })
    }

    /// Creates a writer with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_defaults() -> Result<Self, WriteError> {
        Self::new(InfluxConfig::default())
    }

    /// Returns the writer configuration.
    #[must_use]
    pub const fn config(&self) -> &InfluxConfig {
        &self.config
    }

    /// Writes one series as a single request.
    ///
    /// A series with no finite values is not sent.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server answers with a
    /// non-success status.
    pub async fn write_series(&self, series: &Series) -> Result<(), WriteError> {
        let encoded = encode_series(series, self.config.precision);
        if encoded.dropped > 0 {
            tracing::debug!(
                measurement = %series.name,
                dropped = encoded.dropped,
                "dropped non-finite values"
            );
        }
        if encoded.is_empty() {
            return Ok(());
        }

        let mut query = vec![
            ("db", self.config.database.as_str()),
            ("precision", self.config.precision.as_str()),
        ];
        if let Some(rp) = &self.config.retention_policy {
            query.push(("rp", rp.as_str()));
        }

        let mut request = self
            .client
            .post(self.endpoint.clone())
            .query(&query)
            .body(encoded.body);
        if let Some(username) = &self.config.username {
            request = request.basic_auth(username, self.config.password.as_ref());
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            tracing::trace!(measurement = %series.name, lines = encoded.lines, "write accepted");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(WriteError::Server {
            status: status.as_u16(),
            message: server_message(&body),
        })
    }
}

#[async_trait]
impl PointWriter for InfluxWriter {
    type Error = WriteError;

    async fn write(&self, series: &Series) -> Result<(), WriteError> {
        self.write_series(series).await
    }
}

/// Resolves `<base>/write`, keeping any path prefix of the base URL.
fn write_endpoint(base: &str) -> Result<Url, WriteError> {
    let invalid = |message: String| WriteError::InvalidUrl {
        url: base.to_string(),
        message,
    };
    let mut url = Url::parse(base).map_err(|e| invalid(e.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(invalid("URL cannot be a base".to_string()));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url.join("write").map_err(|e| invalid(e.to_string()))
}

/// Extracts the `error` field of a JSON error body, falling back to the raw body.
fn server_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}
