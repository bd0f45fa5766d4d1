//! Run orchestration
//!
//! One run is strictly sequential:
//!
//! 1. **Fetch**: [`crate::fetcher::pagination::Paginator`] collects every page
//! 2. **CSV**: records are written to the configured file, if any
//! 3. **Load**: [`crate::loader::BatchLoader`] inserts them in one transaction
//!
//! The first failure aborts the run; nothing is checkpointed.
//!
//! # Components
//!
//! - [`executor`] - [`PipelineExecutor`] and [`RunSummary`]
//! - [`config`] - Defaults and rate-limit backoff calculation

pub mod config;
pub mod executor;

pub use executor::{PipelineExecutor, RunSummary};

use crate::fetcher::FetcherError;
use crate::loader::LoadError;
use crate::output::OutputError;

/// Pipeline errors
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Fetch failed
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetcherError),

    /// CSV output failed
    #[error("CSV output failed: {0}")]
    Output(#[from] OutputError),

    /// Warehouse load failed
    #[error("load failed: {0}")]
    Load(#[from] LoadError),
}
