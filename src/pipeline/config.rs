//! Run configuration defaults and rate-limit backoff

use std::time::Duration;

/// Maximum number of attempts for a rate-limited request.
pub const DEFAULT_MAX_RETRIES: u32 = 6;

/// Minimum wait after an HTTP 429, in seconds.
/// Server `Retry-After` hints below this are ignored.
pub const RATE_LIMIT_FLOOR_SECS: u64 = 12;

/// Per-request socket timeout in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of pages followed in one run
pub const DEFAULT_MAX_PAGES: usize = 10_000;

/// Rows per multi-row insert statement
pub const DEFAULT_BATCH_SIZE: usize = 1_000;

/// Default warehouse table
pub const DEFAULT_TABLE: &str = "TICKERS";

/// Default CSV output path
pub const DEFAULT_CSV_PATH: &str = "tickers.csv";

/// Calculate the wait before retrying a rate-limited request
///
/// Uses `max(RATE_LIMIT_FLOOR_SECS, retry_after)` when the header is a
/// non-negative integer, otherwise the floor.
pub fn rate_limit_delay(retry_after: Option<&str>) -> Duration {
    let hinted = retry_after.and_then(|v| v.trim().parse::<u64>().ok());
    let secs = hinted.map_or(RATE_LIMIT_FLOOR_SECS, |h| h.max(RATE_LIMIT_FLOOR_SECS));
    Duration::from_secs(secs)
}
