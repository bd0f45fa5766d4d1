//! Pipeline executor: fetch, write CSV, load

use chrono::NaiveDate;
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

use super::PipelineError;
use crate::fetcher::pagination::Paginator;
use crate::fetcher::HttpTransport;
use crate::loader::{BatchLoader, LoadOptions, WarehouseConnector};
use crate::output::csv::write_tickers_csv;

/// Counts reported at the end of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Date stamped onto every record
    pub run_date: NaiveDate,
    /// Records fetched from the API
    pub fetched: usize,
    /// Rows written to CSV, `None` when CSV output is disabled
    pub csv_rows: Option<u64>,
    /// Rows inserted, `None` when loading is skipped
    pub inserted: Option<u64>,
}

/// Runs one fetch-write-load cycle
pub struct PipelineExecutor<T, C> {
    paginator: Paginator<T>,
    tickers_url: String,
    csv_path: Option<PathBuf>,
    loader: Option<(BatchLoader<C>, LoadOptions)>,
}

impl<T, C> PipelineExecutor<T, C>
where
    T: HttpTransport,
    C: WarehouseConnector,
{
    /// Executor that only fetches
    ///
    /// # Arguments
    /// * `paginator` - Paginator used for the fetch
    /// * `tickers_url` - First-page URL
    pub fn new(paginator: Paginator<T>, tickers_url: impl Into<String>) -> Self {
        Self {
            paginator,
            tickers_url: tickers_url.into(),
            csv_path: None,
            loader: None,
        }
    }

    /// Write fetched records to `path` (`None` disables CSV output)
    pub fn with_csv_path(mut self, path: Option<PathBuf>) -> Self {
        self.csv_path = path;
        self
    }

    /// Load fetched records with `loader`
    pub fn with_loader(mut self, loader: BatchLoader<C>, options: LoadOptions) -> Self {
        self.loader = Some((loader, options));
        self
    }

    /// Borrow the paginator
    pub fn paginator(&self) -> &Paginator<T> {
        &self.paginator
    }

    /// Execute the run
    ///
    /// # Errors
    /// Returns the first fetch, output or load failure
    pub async fn run(&self, run_date: NaiveDate) -> Result<RunSummary, PipelineError> {
        info!("Starting ticker run for {}", run_date);

        let tickers = self
            .paginator
            .collect_all_pages(&self.tickers_url, run_date)
            .await?;
        info!("Fetched {} tickers", tickers.len());

        let csv_rows = match &self.csv_path {
            Some(path) => {
                let written = write_tickers_csv(path, &tickers)?;
                info!("Wrote {} tickers to {}", written, path.display());
                Some(written)
            }
            None => None,
        };

        let inserted = match &self.loader {
            Some((loader, options)) => {
                let inserted = loader.load_with(&tickers, options).await?;
                info!("Inserted {} tickers into {}", inserted, options.table);
                Some(inserted)
            }
            None => {
                info!("Warehouse load skipped");
                None
            }
        };

        Ok(RunSummary {
            run_date,
            fetched: tickers.len(),
            csv_rows,
            inserted,
        })
    }
}
