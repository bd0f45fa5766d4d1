//! File output for fetched tickers
//!
//! [`csv::CsvTickerWriter`] is the only writer; the traits keep the pipeline
//! independent of the file format.

use crate::TickerRecord;

pub mod csv;

/// Output errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// File or directory could not be created or opened
    #[error("IO error: {0}")]
    IoError(String),

    /// Row could not be encoded or decoded
    #[error("CSV error: {0}")]
    CsvError(String),

    /// Buffered rows could not reach the file
    #[error("flush error: {0}")]
    FlushError(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Buffered file writer lifecycle
pub trait OutputWriter {
    /// Push buffered rows to the file
    fn flush(&mut self) -> OutputResult<()>;

    /// Flush, sync and release the file
    fn close(self) -> OutputResult<()>;
}

/// Writer of [`TickerRecord`] rows
pub trait TickersWriter: OutputWriter {
    /// Append one record
    fn write_ticker(&mut self, ticker: &TickerRecord) -> OutputResult<()>;

    /// Append records in order
    fn write_tickers(&mut self, tickers: &[TickerRecord]) -> OutputResult<()> {
        tickers.iter().try_for_each(|t| self.write_ticker(t))
    }
}
