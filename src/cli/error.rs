//! CLI error types and conversions

use crate::fetcher::FetcherError;
use crate::loader::LoadError;
use crate::pipeline::PipelineError;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Pipeline error
    #[error("{0}")]
    PipelineError(#[from] PipelineError),

    /// Fetcher error
    #[error("fetcher error: {0}")]
    FetcherError(#[from] FetcherError),

    /// Load error
    #[error("load error: {0}")]
    LoadError(#[from] LoadError),

    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigurationError(String),
}
