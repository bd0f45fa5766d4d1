//! HTTP client for the reference tickers API
//!
//! Provides:
//! - A `reqwest` transport with a fixed per-request timeout
//! - JSON deserialization of successful responses
//! - Retry on HTTP 429 honoring `Retry-After` above a 12 second floor
//!
//! Every other non-2xx status and every transport error is fatal on first sight.

use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::fetcher::polygon_config::redact_api_key;
use crate::fetcher::retry_formatter::{extract_error_type, RetryContext, RetryErrorType};
use crate::fetcher::{FetcherError, FetcherResult, HttpTransport, RawResponse};
use crate::pipeline::config::rate_limit_delay;

/// Longest response body snippet kept in error messages
const MAX_ERROR_BODY_CHARS: usize = 500;

/// `reqwest`-backed transport
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Build a transport whose requests time out after `timeout`
    ///
    /// # Errors
    /// Returns [`FetcherError::Network`] if the TLS backend cannot be initialized
    pub fn new(timeout: Duration) -> FetcherResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetcherError::Network(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Wrap an existing client
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str) -> FetcherResult<RawResponse> {
        // without_url() keeps the API key out of error text
        let response = self.client.get(url).send().await.map_err(|e| {
            let kind = extract_error_type(None, Some(&e));
            FetcherError::Network(format!("{}: {}", kind.description(), e.without_url()))
        })?;

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response.text().await.map_err(|e| {
            FetcherError::Network(format!("Failed to read response body: {}", e.without_url()))
        })?;

        Ok(RawResponse {
            status,
            retry_after,
            body,
        })
    }
}

/// API client with rate-limit retry over any [`HttpTransport`]
pub struct PolygonHttpClient<T> {
    transport: T,
    max_retries: u32,
}

impl<T: HttpTransport> PolygonHttpClient<T> {
    /// Create a client making at most `max_retries` attempts per rate-limited request
    ///
    /// # Arguments
    /// * `transport` - Transport used for every attempt
    /// * `max_retries` - Total attempt budget, clamped to at least 1
    pub fn new(transport: T, max_retries: u32) -> Self {
        Self {
            transport,
            max_retries: max_retries.max(1),
        }
    }

    /// Configured attempt budget
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Borrow the underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// GET `url` and deserialize the JSON body
    ///
    /// # Errors
    /// - [`FetcherError::RetryExhausted`] after `max_retries` consecutive 429 responses
    /// - [`FetcherError::FatalHttp`] on any other non-2xx status
    /// - [`FetcherError::Network`] when the transport fails
    /// - [`FetcherError::Parse`] when the body is not the expected JSON
    pub async fn fetch_json<R>(&self, url: &str) -> FetcherResult<R>
    where
        R: DeserializeOwned,
    {
        let display_url = redact_api_key(url);
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!(
                "GET {} (attempt {}/{})",
                display_url, attempt, self.max_retries
            );

            let response = self.transport.get(url).await?;

            if response.status == 429 {
                let wait = rate_limit_delay(response.retry_after.as_deref());
                let ctx = RetryContext::new(
                    attempt,
                    self.max_retries,
                    RetryErrorType::RateLimited,
                    wait,
                    display_url.clone(),
                    format!(
                        "HTTP 429 (Retry-After: {})",
                        response.retry_after.as_deref().unwrap_or("none")
                    ),
                );

                if attempt >= self.max_retries {
                    error!("{}", ctx.format_failure());
                    return Err(FetcherError::RetryExhausted {
                        url: display_url,
                        attempts: attempt,
                    });
                }

                warn!("{}", ctx.format_retry());
                tokio::time::sleep(wait).await;
                continue;
            }

            if !response.is_success() {
                let kind = extract_error_type(Some(response.status), None);
                error!(
                    "Request failed with {} ({}): {} - {}",
                    response.status,
                    kind.description(),
                    display_url,
                    kind.suggestion()
                );
                return Err(FetcherError::FatalHttp {
                    url: display_url,
                    status: response.status,
                    body: truncate_body(&response.body),
                });
            }

            if attempt > 1 {
                let ctx = RetryContext::new(
                    attempt,
                    self.max_retries,
                    RetryErrorType::RateLimited,
                    Duration::ZERO,
                    display_url.clone(),
                    String::new(),
                );
                info!("{}", ctx.format_success());
            }

            return serde_json::from_str(&response.body).map_err(|e| {
                FetcherError::Parse(format!(
                    "Failed to deserialize response from {display_url}: {e}"
                ))
            });
        }
    }
}

fn truncate_body(body: &str) -> String {
    if body.chars().count() <= MAX_ERROR_BODY_CHARS {
        body.to_string()
    } else {
        let mut snippet: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
        snippet.push_str("...");
        snippet
    }
}
