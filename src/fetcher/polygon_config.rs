//! Reference tickers API configuration
//!
//! Holds the endpoint, the default ticker query and the helpers that attach and
//! redact the `apiKey` query parameter. The key must be present on every request,
//! continuation links included, and must never reach logs or error messages.

use reqwest::Url;
use std::time::Duration;

use crate::fetcher::{FetcherError, FetcherResult};
use crate::pipeline::config::{
    DEFAULT_MAX_PAGES, DEFAULT_MAX_RETRIES, DEFAULT_REQUEST_TIMEOUT_SECS,
};

/// Default API host
pub const DEFAULT_BASE_URL: &str = "https://api.polygon.io";

/// Reference tickers endpoint path
pub const TICKERS_ENDPOINT: &str = "/v3/reference/tickers";

/// Query parameter carrying the API key
pub const API_KEY_PARAM: &str = "apiKey";

/// Largest page size the endpoint accepts
pub const MAX_PAGE_LIMIT: u32 = 1000;

const REDACTED: &str = "REDACTED";

/// Filters and ordering for the tickers query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickerQuery {
    /// Market filter (e.g., "stocks")
    pub market: String,
    /// Only actively traded tickers
    pub active: bool,
    /// Sort direction ("asc" or "desc")
    pub order: String,
    /// Sort field
    pub sort: String,
    /// Records per page
    pub limit: u32,
}

impl Default for TickerQuery {
    fn default() -> Self {
        Self {
            market: "stocks".to_string(),
            active: true,
            order: "asc".to_string(),
            sort: "ticker".to_string(),
            limit: MAX_PAGE_LIMIT,
        }
    }
}

/// Connection and paging settings for the API
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// API key sent as the `apiKey` query parameter
    pub api_key: String,
    /// Scheme and host (e.g., <https://api.polygon.io>)
    pub base_url: String,
    /// Ticker query parameters
    pub query: TickerQuery,
    /// Maximum attempts for a rate-limited request
    pub max_retries: u32,
    /// Maximum pages followed in one run
    pub max_pages: usize,
    /// Per-request timeout
    pub request_timeout: Duration,
}

impl ApiConfig {
    /// Config with default host, query and limits
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            query: TickerQuery::default(),
            max_retries: DEFAULT_MAX_RETRIES,
            max_pages: DEFAULT_MAX_PAGES,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    /// First-page URL for the ticker query, without the API key
    pub fn tickers_url(&self) -> FetcherResult<String> {
        let raw = format!("{}{}", self.base_url.trim_end_matches('/'), TICKERS_ENDPOINT);
        let mut url = Url::parse(&raw).map_err(|e| FetcherError::InvalidUrl(format!("{raw}: {e}")))?;
        url.query_pairs_mut()
            .append_pair("market", &self.query.market)
            .append_pair("active", if self.query.active { "true" } else { "false" })
            .append_pair("order", &self.query.order)
            .append_pair("limit", &self.query.limit.to_string())
            .append_pair("sort", &self.query.sort);
        Ok(url.to_string())
    }
}

/// Set the `apiKey` query parameter on `url`, replacing any existing value
pub fn with_api_key(url: &str, api_key: &str) -> FetcherResult<String> {
    let mut parsed = Url::parse(url).map_err(|e| FetcherError::InvalidUrl(format!("{url}: {e}")))?;
    let kept: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| k != API_KEY_PARAM)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    parsed
        .query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair(API_KEY_PARAM, api_key);
    Ok(parsed.to_string())
}

/// Replace the `apiKey` value in `url` for logging
pub fn redact_api_key(url: &str) -> String {
    let Ok(mut parsed) = Url::parse(url) else {
        return url.to_string();
    };
    if !parsed.query_pairs().any(|(k, _)| k == API_KEY_PARAM) {
        return url.to_string();
    }

    let pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .map(|(k, v)| {
            if k == API_KEY_PARAM {
                (k.into_owned(), REDACTED.to_string())
            } else {
                (k.into_owned(), v.into_owned())
            }
        })
        .collect();
    parsed.query_pairs_mut().clear().extend_pairs(pairs);
    parsed.to_string()
}
