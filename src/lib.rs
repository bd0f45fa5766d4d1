//! # Ticker Loader Library
//!
//! Fetches the Polygon.io stock reference ticker list, writes it to CSV and
//! bulk-loads it into a warehouse table.
//!
//! ## Features
//!
//! - **Cursor Pagination**: Follows `next_url` continuation links with the API key re-attached
//! - **Rate Limit Retry**: Honors `Retry-After` on HTTP 429 with a 12 second floor
//! - **CSV Output**: Fixed-header CSV file shared with the load schema
//! - **Batched Loading**: Multi-row inserts inside a single transaction
//!
//! ## Quick Start
//!
//! ```no_run
//! use chrono::NaiveDate;
//! use ticker_loader::fetcher::http::{PolygonHttpClient, ReqwestTransport};
//! use ticker_loader::fetcher::pagination::Paginator;
//! use ticker_loader::fetcher::polygon_config::ApiConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ApiConfig::new("my-api-key");
//! let transport = ReqwestTransport::new(config.request_timeout)?;
//! let client = PolygonHttpClient::new(transport, config.max_retries);
//! let paginator = Paginator::new(client, config.api_key.clone(), config.max_pages);
//!
//! let run_date = NaiveDate::from_ymd_opt(2025, 9, 16).unwrap();
//! let tickers = paginator
//!     .collect_all_pages(&config.tickers_url()?, run_date)
//!     .await?;
//! println!("fetched {} tickers", tickers.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`fetcher`] - HTTP client with rate-limit retry and the cursor paginator
//! - [`schema`] - Column declaration shared by CSV output and the loader
//! - [`output`] - CSV writer and reader
//! - [`loader`] - Batched warehouse loader and the `tokio-postgres` backend
//! - [`pipeline`] - Orchestration of fetch, CSV and load for one run
//! - [`cli`] - Environment-backed command line configuration

#![warn(missing_docs)]
#![warn(clippy::all)]

use chrono::NaiveDate;
use serde::de::{self, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// Command line and environment configuration
pub mod cli;

/// HTTP fetching and pagination
pub mod fetcher;

/// Warehouse loading
pub mod loader;

/// Data output writers
pub mod output;

/// Run orchestration
pub mod pipeline;

/// Ticker column schema
pub mod schema;

pub use schema::{CellValue, Column, ColumnType, TickerField, TICKER_COLUMNS};

/// One reference ticker as returned by the API, plus the run date it was fetched on.
///
/// Field order matches [`TICKER_COLUMNS`]; the CSV writer relies on it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TickerRecord {
    /// Ticker symbol (e.g., "HUM")
    pub ticker: Option<String>,
    /// Company name
    pub name: Option<String>,
    /// Market type (e.g., "stocks")
    pub market: Option<String>,
    /// Locale (e.g., "us")
    pub locale: Option<String>,
    /// Primary listing exchange MIC (e.g., "XNYS")
    pub primary_exchange: Option<String>,
    /// Security type code (e.g., "CS")
    #[serde(rename = "type")]
    pub security_type: Option<String>,
    /// Whether the ticker is actively traded
    #[serde(default, deserialize_with = "deserialize_active")]
    pub active: Option<bool>,
    /// Trading currency name (e.g., "usd")
    pub currency_name: Option<String>,
    /// SEC Central Index Key
    pub cik: Option<String>,
    /// Composite OpenFIGI
    pub composite_figi: Option<String>,
    /// Share class OpenFIGI
    pub share_class_figi: Option<String>,
    /// Last update timestamp as sent by the API (RFC3339, UTC)
    pub last_updated_utc: Option<String>,
    /// Date of the run that fetched this record
    #[serde(default)]
    pub run_date: Option<NaiveDate>,
}

impl TickerRecord {
    /// Stamp the record with the run date, replacing any previous stamp
    pub fn stamp(&mut self, run_date: NaiveDate) {
        self.run_date = Some(run_date);
    }
}

/// Accepts booleans, 0/1 and "true"/"false"/"1"/"0" strings for the `active` flag.
/// Anything else becomes `None` with a warning so one malformed record cannot fail a page.
fn deserialize_active<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    struct ActiveVisitor;

    fn unrecognized(value: impl fmt::Display) -> Option<bool> {
        warn!("Unrecognized active flag {}, storing NULL", value);
        None
    }

    impl<'de> Visitor<'de> for ActiveVisitor {
        type Value = Option<bool>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a boolean, 0/1, or a \"true\"/\"false\" string")
        }

        fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
            Ok(Some(v))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            Ok(match v {
                0 => Some(false),
                1 => Some(true),
                _ => unrecognized(v),
            })
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            Ok(match v {
                0 => Some(false),
                1 => Some(true),
                _ => unrecognized(v),
            })
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
            Ok(unrecognized(v))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(match v.trim().to_ascii_lowercase().as_str() {
                "" => None,
                "true" | "1" => Some(true),
                "false" | "0" => Some(false),
                _ => unrecognized(format_args!("{v:?}")),
            })
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            while seq.next_element::<IgnoredAny>()?.is_some() {}
            Ok(unrecognized("array"))
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {}
            Ok(unrecognized("object"))
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_some<D2>(self, deserializer: D2) -> Result<Self::Value, D2::Error>
        where
            D2: Deserializer<'de>,
        {
            deserializer.deserialize_any(ActiveVisitor)
        }
    }

    deserializer.deserialize_any(ActiveVisitor)
}
