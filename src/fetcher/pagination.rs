//! Cursor pagination over the reference tickers endpoint
//!
//! Each response may carry a `next_url` continuation link. The paginator follows
//! links until one is absent, re-attaching the API key to every request and
//! stamping each record with the run date.
//!
//! Includes safety mechanisms:
//! - Maximum page limit to prevent infinite loops on a server that never stops
//!   returning continuation links
//! - Absent or null `results` treated as an empty page

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, info};

use crate::fetcher::http::PolygonHttpClient;
use crate::fetcher::polygon_config::{redact_api_key, with_api_key};
use crate::fetcher::{FetcherError, FetcherResult, HttpTransport};
use crate::TickerRecord;

/// One page of the tickers response
#[derive(Debug, Deserialize)]
pub struct TickerPage {
    /// Records on this page
    #[serde(default)]
    pub results: Option<Vec<TickerRecord>>,
    /// Continuation link, without the API key
    #[serde(default)]
    pub next_url: Option<String>,
}

impl TickerPage {
    /// Continuation link, treating null and empty strings as absent
    pub fn continuation(&self) -> Option<&str> {
        self.next_url.as_deref().map(str::trim).filter(|u| !u.is_empty())
    }
}

/// Drives [`PolygonHttpClient`] across cursor pagination
pub struct Paginator<T> {
    client: PolygonHttpClient<T>,
    api_key: String,
    max_pages: usize,
}

impl<T: HttpTransport> Paginator<T> {
    /// Create a paginator
    ///
    /// # Arguments
    /// * `client` - HTTP client used for every page
    /// * `api_key` - Key attached to every request
    /// * `max_pages` - Upper bound on pages fetched, clamped to at least 1
    pub fn new(client: PolygonHttpClient<T>, api_key: impl Into<String>, max_pages: usize) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            max_pages: max_pages.max(1),
        }
    }

    /// Borrow the underlying HTTP client
    pub fn client(&self) -> &PolygonHttpClient<T> {
        &self.client
    }

    /// Fetch every page starting at `base_url`
    ///
    /// # Arguments
    /// * `base_url` - First-page URL; any `apiKey` already present is replaced
    /// * `run_date` - Date stamped onto every record
    ///
    /// # Returns
    /// All records in API response order
    ///
    /// # Errors
    /// Propagates the first fetch failure. Returns
    /// [`FetcherError::PageLimitExceeded`] if a continuation link remains after
    /// `max_pages` pages.
    pub async fn collect_all_pages(
        &self,
        base_url: &str,
        run_date: NaiveDate,
    ) -> FetcherResult<Vec<TickerRecord>> {
        let mut all_records = Vec::new();
        let mut next_url = base_url.to_string();
        let mut pages = 0;

        loop {
            let url = with_api_key(&next_url, &self.api_key)?;
            if pages > 0 {
                info!("Requesting next page: {}", redact_api_key(&url));
            }

            let page: TickerPage = self.client.fetch_json(&url).await?;
            pages += 1;

            let continuation = page.continuation().map(str::to_string);
            let records = page.results.unwrap_or_default();
            debug!("Received {} tickers in page {}", records.len(), pages);

            all_records.extend(records.into_iter().map(|mut record| {
                record.stamp(run_date);
                record
            }));

            let Some(link) = continuation else {
                break;
            };

            if pages >= self.max_pages {
                return Err(FetcherError::PageLimitExceeded {
                    max_pages: self.max_pages,
                    next_url: redact_api_key(&link),
                });
            }

            next_url = link;
        }

        debug!(
            "Pagination completed after {} pages. Total tickers: {}",
            pages,
            all_records.len()
        );

        Ok(all_records)
    }
}
