//! CSV output for ticker records
//!
//! The header row comes from [`crate::schema::csv_header`] and is written when
//! the file is created, so a run with zero records still yields a valid file.

use crate::schema::csv_header;
use crate::TickerRecord;
use csv::{Writer, WriterBuilder};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::{debug, info};

use super::{OutputError, OutputResult, OutputWriter, TickersWriter};

const DEFAULT_BUFFER_SIZE: usize = 8192; // 8KB buffer

/// Flush every N rows
const FLUSH_INTERVAL: u64 = 1000;

/// CSV writer for ticker records
pub struct CsvTickerWriter {
    writer: Writer<BufWriter<File>>,
    tickers_written: u64,
}

impl CsvTickerWriter {
    /// Create the file (and parent directories) and write the header row
    ///
    /// # Arguments
    /// * `path` - Output file path; an existing file is truncated
    pub fn new<P: AsRef<Path>>(path: P) -> OutputResult<Self> {
        Self::new_with_buffer_size(path, DEFAULT_BUFFER_SIZE)
    }

    /// Create a writer with a custom write buffer size in bytes
    pub fn new_with_buffer_size<P: AsRef<Path>>(
        path: P,
        buffer_size: usize,
    ) -> OutputResult<Self> {
        let path = path.as_ref();
        info!("Creating CSV writer: path={}", path.display());

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    OutputError::IoError(format!("Failed to create directory: {}", e))
                })?;
            }
        }

        let file = File::create(path)
            .map_err(|e| OutputError::IoError(format!("Failed to create file: {}", e)))?;

        let buf_writer = BufWriter::with_capacity(buffer_size, file);
        // Header is written explicitly so it appears even with zero rows
        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .from_writer(buf_writer);

        writer
            .write_record(csv_header())
            .map_err(|e| OutputError::CsvError(format!("Failed to write header: {}", e)))?;
        debug!("CSV header written");

        Ok(Self {
            writer,
            tickers_written: 0,
        })
    }

    /// Number of rows written so far, header excluded
    pub fn tickers_written(&self) -> u64 {
        self.tickers_written
    }
}

impl TickersWriter for CsvTickerWriter {
    fn write_ticker(&mut self, ticker: &TickerRecord) -> OutputResult<()> {
        self.writer
            .serialize(ticker)
            .map_err(|e| OutputError::CsvError(format!("Failed to write ticker: {}", e)))?;

        self.tickers_written += 1;

        if self.tickers_written % FLUSH_INTERVAL == 0 {
            self.flush()?;
            debug!("Progress: {} tickers written", self.tickers_written);
        }

        Ok(())
    }
}

impl OutputWriter for CsvTickerWriter {
    fn flush(&mut self) -> OutputResult<()> {
        self.writer
            .flush()
            .map_err(|e| OutputError::FlushError(format!("Failed to flush: {}", e)))
    }

    fn close(mut self) -> OutputResult<()> {
        debug!(
            "Closing CSV writer: {} total tickers written",
            self.tickers_written
        );

        self.flush()?;

        let buf_writer = self.writer.into_inner().map_err(|e| {
            OutputError::IoError(format!("Failed to get inner writer: {}", e))
        })?;

        let file = buf_writer.into_inner().map_err(|e| {
            OutputError::IoError(format!("Failed to get file handle: {}", e))
        })?;

        file.sync_all()
            .map_err(|e| OutputError::IoError(format!("Failed to sync file: {}", e)))?;

        info!(
            "CSV writer closed successfully: {} tickers written",
            self.tickers_written
        );
        Ok(())
    }
}

/// Write `tickers` to a new CSV file at `path`
///
/// # Returns
/// Number of rows written
pub fn write_tickers_csv<P: AsRef<Path>>(path: P, tickers: &[TickerRecord]) -> OutputResult<u64> {
    let mut writer = CsvTickerWriter::new(path)?;
    writer.write_tickers(tickers)?;
    let written = writer.tickers_written();
    writer.close()?;
    Ok(written)
}

/// Read ticker records from a CSV file written by [`CsvTickerWriter`]
pub fn read_tickers<P: AsRef<Path>>(path: P) -> OutputResult<Vec<TickerRecord>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| OutputError::IoError(format!("Failed to open {}: {}", path.display(), e)))?;

    let headers = reader
        .headers()
        .map_err(|e| OutputError::CsvError(format!("Failed to read header: {}", e)))?;
    if headers.iter().ne(csv_header().iter().map(String::as_str)) {
        return Err(OutputError::CsvError(format!(
            "Unexpected header in {}: {:?}",
            path.display(),
            headers
        )));
    }

    reader
        .deserialize()
        .map(|row| row.map_err(|e| OutputError::CsvError(format!("Failed to read ticker: {}", e))))
        .collect()
}
