//! HTTP fetching and cursor pagination for the reference tickers API

use async_trait::async_trait;

pub mod http;
pub mod pagination;
pub mod polygon_config;
pub mod retry_formatter;

/// Fetcher errors
#[derive(Debug, thiserror::Error)]
pub enum FetcherError {
    /// Rate limit retries exhausted
    #[error("rate limit retries exhausted after {attempts} attempts: {url}")]
    RetryExhausted {
        /// Offending URL with the API key redacted
        url: String,
        /// Number of requests made
        attempts: u32,
    },

    /// Non-retryable HTTP error status
    #[error("HTTP error {status} for {url}: {body}")]
    FatalHttp {
        /// Offending URL with the API key redacted
        url: String,
        /// HTTP status code
        status: u16,
        /// Response body text
        body: String,
    },

    /// Network error
    #[error("network error: {0}")]
    Network(String),

    /// Response parse error
    #[error("parse error: {0}")]
    Parse(String),

    /// URL could not be parsed or rewritten
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Pagination kept returning continuation links past the page bound
    #[error("page limit ({max_pages}) exceeded - continuation link still present: {next_url}")]
    PageLimitExceeded {
        /// Configured page bound
        max_pages: usize,
        /// Continuation link that was not followed, API key redacted
        next_url: String,
    },
}

/// Result type for fetcher operations
pub type FetcherResult<T> = Result<T, FetcherError>;

/// Status, retry hint and body of one HTTP response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status code
    pub status: u16,
    /// Raw `Retry-After` header value, if any
    pub retry_after: Option<String>,
    /// Response body text
    pub body: String,
}

impl RawResponse {
    /// Whether the status is in the 2xx range
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport seam for issuing GET requests
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Issue a single GET request without retrying
    ///
    /// # Errors
    /// Returns [`FetcherError::Network`] when no response was received
    async fn get(&self, url: &str) -> FetcherResult<RawResponse>;
}
