//! Command line arguments backed by environment variables
//!
//! Every setting reads its environment variable (a `.env` file is loaded first by
//! the binary), so the program runs with no arguments at all. Flags override the
//! environment.

use chrono::{NaiveDate, Utc};
use clap::builder::BoolishValueParser;
use clap::Parser;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use super::CliError;
use crate::fetcher::http::{PolygonHttpClient, ReqwestTransport};
use crate::fetcher::pagination::Paginator;
use crate::fetcher::polygon_config::{ApiConfig, TickerQuery, DEFAULT_BASE_URL, MAX_PAGE_LIMIT};
use crate::loader::postgres::DEFAULT_PORT;
use crate::loader::{
    check_batch_size, validate_identifier, BatchLoader, LoadOptions, PostgresConnector,
    WarehouseConfig,
};
use crate::pipeline::config::{
    DEFAULT_BATCH_SIZE, DEFAULT_CSV_PATH, DEFAULT_MAX_PAGES, DEFAULT_MAX_RETRIES,
    DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_TABLE,
};
use crate::pipeline::{PipelineExecutor, RunSummary};
use crate::schema;

/// Parse a strictly positive count
fn parse_positive(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;

    if value == 0 {
        return Err("value must be at least 1".to_string());
    }
    Ok(value)
}

/// Summary output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Human-readable output
    Human,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "human" => Ok(OutputFormat::Human),
            _ => Err(format!("Invalid output format: {s}")),
        }
    }
}

/// Ticker loader CLI
#[derive(Parser, Debug)]
#[command(name = "ticker-loader")]
#[command(about = "Fetch reference tickers, write them to CSV and load them into the warehouse", long_about = None)]
#[command(version)]
pub struct Cli {
    /// API key sent with every request
    #[arg(long, env = "POLYGON_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// API scheme and host
    #[arg(long, env = "POLYGON_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Records per page (1-1000)
    #[arg(long, env = "PAGE_LIMIT", default_value_t = MAX_PAGE_LIMIT, value_parser = clap::value_parser!(u32).range(1..=1000))]
    pub page_limit: u32,

    /// Maximum attempts for a rate-limited request (1-20)
    #[arg(long, env = "MAX_RETRIES", default_value_t = DEFAULT_MAX_RETRIES, value_parser = clap::value_parser!(u32).range(1..=20))]
    pub max_retries: u32,

    /// Maximum pages followed before giving up
    #[arg(long, env = "MAX_PAGES", default_value_t = DEFAULT_MAX_PAGES, value_parser = parse_positive)]
    pub max_pages: usize,

    /// Per-request timeout in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..))]
    pub request_timeout_secs: u64,

    /// CSV output path; empty disables CSV output
    #[arg(long, env = "CSV_PATH", default_value = DEFAULT_CSV_PATH)]
    pub csv_path: String,

    /// Run date stamped on every record (YYYY-MM-DD, default: today UTC)
    #[arg(long, env = "RUN_DATE")]
    pub run_date: Option<NaiveDate>,

    /// Target warehouse table, optionally schema-qualified
    #[arg(long, env = "TARGET_TABLE", default_value = DEFAULT_TABLE)]
    pub table: String,

    /// Truncate the target table before loading
    #[arg(long, env = "TRUNCATE", default_value_t = false, value_parser = BoolishValueParser::new())]
    pub truncate: bool,

    /// Rows per insert statement (at most 5041 with all 13 columns)
    #[arg(long, env = "BATCH_SIZE", default_value_t = DEFAULT_BATCH_SIZE, value_parser = parse_positive)]
    pub batch_size: usize,

    /// Fetch (and write CSV) without loading the warehouse
    #[arg(long, env = "SKIP_LOAD", default_value_t = false, value_parser = BoolishValueParser::new())]
    pub skip_load: bool,

    /// Warehouse host
    #[arg(long, env = "WAREHOUSE_HOST")]
    pub warehouse_host: Option<String>,

    /// Warehouse port
    #[arg(long, env = "WAREHOUSE_PORT", default_value_t = DEFAULT_PORT)]
    pub warehouse_port: u16,

    /// Warehouse user
    #[arg(long, env = "WAREHOUSE_USER")]
    pub warehouse_user: Option<String>,

    /// Warehouse password
    #[arg(long, env = "WAREHOUSE_PASSWORD", hide_env_values = true)]
    pub warehouse_password: Option<String>,

    /// Warehouse database
    #[arg(long, env = "WAREHOUSE_DATABASE")]
    pub warehouse_database: Option<String>,

    /// Schema placed on the search path
    #[arg(long, env = "WAREHOUSE_SCHEMA")]
    pub warehouse_schema: Option<String>,

    /// Role assumed after login
    #[arg(long, env = "WAREHOUSE_ROLE")]
    pub warehouse_role: Option<String>,

    /// Summary format (json or human)
    #[arg(long, env = "OUTPUT_FORMAT", default_value = "human")]
    pub output_format: OutputFormat,
}

/// Validated settings for one run
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// API settings
    pub api: ApiConfig,
    /// CSV output path, `None` when disabled
    pub csv_path: Option<PathBuf>,
    /// Date stamped on every record
    pub run_date: NaiveDate,
    /// Warehouse connection, `None` when loading is skipped
    pub warehouse: Option<WarehouseConfig>,
    /// Table and batching settings
    pub load: LoadOptions,
}

impl Cli {
    /// Validate arguments into a [`RunConfig`]
    ///
    /// # Errors
    /// Returns [`CliError::ConfigurationError`] for a blank API key or missing
    /// warehouse credentials, and [`CliError::LoadError`] for an invalid table name or
    /// a batch size that overflows the statement parameter limit.
    pub fn into_config(self) -> Result<RunConfig, CliError> {
        let api_key = self.api_key.trim().to_string();
        if api_key.is_empty() {
            return Err(CliError::ConfigurationError(
                "POLYGON_API_KEY is empty".to_string(),
            ));
        }

        validate_identifier(&self.table, true)?;
        check_batch_size(self.batch_size, schema::TICKER_COLUMNS.len())?;

        let warehouse = if self.skip_load {
            None
        } else {
            Some(self.warehouse_config()?)
        };

        let api = ApiConfig {
            api_key,
            base_url: self.base_url,
            query: TickerQuery {
                limit: self.page_limit,
                ..TickerQuery::default()
            },
            max_retries: self.max_retries,
            max_pages: self.max_pages,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        };

        let csv_path = Some(self.csv_path.trim())
            .filter(|p| !p.is_empty())
            .map(PathBuf::from);

        Ok(RunConfig {
            api,
            csv_path,
            run_date: self.run_date.unwrap_or_else(|| Utc::now().date_naive()),
            warehouse,
            load: LoadOptions {
                table: self.table,
                columns: schema::column_names(),
                truncate: self.truncate,
                batch_size: self.batch_size,
            },
        })
    }

    fn warehouse_config(&self) -> Result<WarehouseConfig, CliError> {
        let required = [
            ("WAREHOUSE_HOST", &self.warehouse_host),
            ("WAREHOUSE_USER", &self.warehouse_user),
            ("WAREHOUSE_PASSWORD", &self.warehouse_password),
            ("WAREHOUSE_DATABASE", &self.warehouse_database),
        ];
        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, value)| value.as_deref().map_or(true, |v| v.trim().is_empty()))
            .map(|(name, _)| *name)
            .collect();

        if !missing.is_empty() {
            return Err(CliError::ConfigurationError(format!(
                "missing warehouse settings: {} (set SKIP_LOAD=true to skip loading)",
                missing.join(", ")
            )));
        }

        let value = |v: &Option<String>| v.clone().unwrap_or_default();
        let mut config = WarehouseConfig::new(
            value(&self.warehouse_host),
            value(&self.warehouse_user),
            value(&self.warehouse_password),
            value(&self.warehouse_database),
        );
        config.port = self.warehouse_port;
        config.schema = self.warehouse_schema.clone().filter(|s| !s.trim().is_empty());
        config.role = self.warehouse_role.clone().filter(|r| !r.trim().is_empty());
        Ok(config)
    }

    /// Build the components, run the pipeline and print the summary
    pub async fn execute(self) -> Result<RunSummary, CliError> {
        let output_format = self.output_format;
        let config = self.into_config()?;

        let transport = ReqwestTransport::new(config.api.request_timeout)?;
        let client = PolygonHttpClient::new(transport, config.api.max_retries);
        let paginator = Paginator::new(client, config.api.api_key.clone(), config.api.max_pages);

        let mut executor = PipelineExecutor::new(paginator, config.api.tickers_url()?)
            .with_csv_path(config.csv_path.clone());
        if let Some(warehouse) = config.warehouse.clone() {
            executor = executor.with_loader(
                BatchLoader::new(PostgresConnector::new(warehouse)),
                config.load.clone(),
            );
        }

        let summary = executor.run(config.run_date).await?;
        print_summary(&summary, output_format);
        Ok(summary)
    }
}

fn print_summary(summary: &RunSummary, format: OutputFormat) {
    match format {
        OutputFormat::Json => match serde_json::to_string(summary) {
            Ok(json) => println!("{json}"),
            Err(e) => tracing::warn!("Failed to serialize run summary: {}", e),
        },
        OutputFormat::Human => {
            println!("Run date: {}", summary.run_date);
            println!("Tickers fetched: {}", summary.fetched);
            match summary.csv_rows {
                Some(rows) => println!("CSV rows written: {rows}"),
                None => println!("CSV rows written: skipped"),
            }
            match summary.inserted {
                Some(rows) => println!("Rows inserted: {rows}"),
                None => println!("Rows inserted: skipped"),
            }
        }
    }
}
