//! Batched warehouse loading
//!
//! [`BatchLoader`] projects ticker records onto a requested column order and
//! submits them as multi-row `INSERT` statements, one statement per batch.
//!
//! # Transaction scope
//!
//! A load runs as one transaction: `BEGIN`, optional `TRUNCATE`, every insert
//! batch, then a single `COMMIT`. Any failure issues `ROLLBACK`, so the table is
//! either fully loaded or unchanged. The session is closed before `load`
//! returns whether or not the load succeeded.
//!
//! # Components
//!
//! - [`WarehouseConnector`] / [`WarehouseSession`] - backend seam
//! - [`postgres`] - `tokio-postgres` backend

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::pipeline::config::{DEFAULT_BATCH_SIZE, DEFAULT_TABLE};
use crate::schema::{self, CellValue, Column, ColumnType};
use crate::TickerRecord;

pub mod postgres;

pub use postgres::{PostgresConnector, WarehouseConfig};

/// Load errors
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// Could not open a warehouse session
    #[error("connection error: {0}")]
    Connect(String),

    /// A statement failed
    #[error("statement error: {0}")]
    Statement(String),

    /// Requested column is not part of the ticker schema
    #[error("unknown column: {0}")]
    UnknownColumn(String),

    /// Table, schema, role or column name is not a plain identifier
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Batch size of zero
    #[error("batch size must be at least 1")]
    InvalidBatchSize,

    /// One insert statement would bind more parameters than the protocol allows
    #[error("batch size {batch_size} exceeds {max_rows} rows for {columns} columns (65535 bind parameters per statement)")]
    BatchTooLarge {
        /// Requested rows per statement
        batch_size: usize,
        /// Largest allowed rows per statement
        max_rows: usize,
        /// Columns per row
        columns: usize,
    },
}

/// Bind parameter limit of a single statement on the Postgres wire protocol
pub const MAX_BIND_PARAMS: usize = 65_535;

/// Result type for load operations
pub type LoadResult<T> = Result<T, LoadError>;

/// Opens warehouse sessions
#[async_trait]
pub trait WarehouseConnector: Send + Sync {
    /// Open a new session
    async fn connect(&self) -> LoadResult<Box<dyn WarehouseSession>>;
}

/// One open warehouse connection
#[async_trait]
pub trait WarehouseSession: Send {
    /// Start a transaction
    async fn begin(&mut self) -> LoadResult<()>;

    /// Execute a statement with positional parameters
    ///
    /// # Returns
    /// Number of rows affected
    async fn execute(&mut self, sql: &str, params: &[CellValue]) -> LoadResult<u64>;

    /// Commit the open transaction
    async fn commit(&mut self) -> LoadResult<()>;

    /// Roll back the open transaction
    async fn rollback(&mut self) -> LoadResult<()>;

    /// Release the connection
    async fn close(&mut self) -> LoadResult<()>;
}

/// Target table and batching for one load
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    /// Target table, optionally schema-qualified
    pub table: String,
    /// Column order; names are matched case-insensitively against the schema
    pub columns: Vec<String>,
    /// Truncate the table before inserting
    pub truncate: bool,
    /// Rows per insert statement
    pub batch_size: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            table: DEFAULT_TABLE.to_string(),
            columns: schema::column_names(),
            truncate: false,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// Loads ticker records through a [`WarehouseConnector`]
pub struct BatchLoader<C> {
    connector: C,
}

impl<C: WarehouseConnector> BatchLoader<C> {
    /// Create a loader
    pub fn new(connector: C) -> Self {
        Self { connector }
    }

    /// Borrow the connector
    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Load with the settings in `options`
    pub async fn load_with(&self, records: &[TickerRecord], options: &LoadOptions) -> LoadResult<u64> {
        self.load(
            records,
            &options.table,
            &options.columns,
            options.truncate,
            options.batch_size,
        )
        .await
    }

    /// Insert `records` into `table_name`
    ///
    /// # Arguments
    /// * `records` - Rows to insert; an empty slice returns 0 without connecting
    /// * `table_name` - Target table, optionally schema-qualified
    /// * `column_order` - Columns to project, in insert order
    /// * `truncate` - Truncate the table first, inside the same transaction
    /// * `batch_size` - Rows per insert statement
    ///
    /// # Returns
    /// Total rows submitted
    ///
    /// # Errors
    /// Validation errors are returned before connecting. Statement errors roll
    /// back the whole load.
    pub async fn load(
        &self,
        records: &[TickerRecord],
        table_name: &str,
        column_order: &[String],
        truncate: bool,
        batch_size: usize,
    ) -> LoadResult<u64> {
        if records.is_empty() {
            info!("No tickers to load - skipping warehouse connection");
            return Ok(0);
        }

        if batch_size == 0 {
            return Err(LoadError::InvalidBatchSize);
        }

        validate_identifier(table_name, true)?;
        let columns = resolve_columns(column_order)?;
        check_batch_size(batch_size, columns.len())?;

        info!(
            "Loading {} tickers into {} in batches of {}",
            records.len(),
            table_name,
            batch_size
        );

        let mut session = self.connector.connect().await?;
        let result = insert_all(
            session.as_mut(),
            table_name,
            &columns,
            records,
            truncate,
            batch_size,
        )
        .await;

        if let Err(e) = &result {
            warn!("Load into {} failed, rolling back: {}", table_name, e);
            if let Err(rollback_err) = session.rollback().await {
                error!("Rollback failed: {}", rollback_err);
            }
        }

        if let Err(e) = session.close().await {
            warn!("Failed to close warehouse session: {}", e);
        }

        result
    }
}

async fn insert_all(
    session: &mut dyn WarehouseSession,
    table_name: &str,
    columns: &[&'static Column],
    records: &[TickerRecord],
    truncate: bool,
    batch_size: usize,
) -> LoadResult<u64> {
    session.begin().await?;

    if truncate {
        info!("Truncating {}", table_name);
        session
            .execute(&format!("TRUNCATE TABLE {table_name}"), &[])
            .await?;
    }

    let mut inserted = 0u64;
    for (index, batch) in records.chunks(batch_size).enumerate() {
        let sql = build_insert_sql(table_name, columns, batch.len());
        let params: Vec<CellValue> = batch
            .iter()
            .flat_map(|record| columns.iter().map(move |column| record.cell(column)))
            .collect();

        session.execute(&sql, &params).await?;
        inserted += batch.len() as u64;
        debug!(
            "Inserted batch {} ({} rows, {} total)",
            index + 1,
            batch.len(),
            inserted
        );
    }

    session.commit().await?;
    info!("Committed {} tickers into {}", inserted, table_name);
    Ok(inserted)
}

/// Largest batch whose insert stays within [`MAX_BIND_PARAMS`]
pub fn max_batch_rows(column_count: usize) -> usize {
    MAX_BIND_PARAMS / column_count.max(1)
}

/// Reject batch sizes of zero or above [`max_batch_rows`]
pub fn check_batch_size(batch_size: usize, column_count: usize) -> LoadResult<()> {
    if batch_size == 0 {
        return Err(LoadError::InvalidBatchSize);
    }

    let max_rows = max_batch_rows(column_count);
    if batch_size > max_rows {
        return Err(LoadError::BatchTooLarge {
            batch_size,
            max_rows,
            columns: column_count,
        });
    }
    Ok(())
}

/// Resolve requested names against the schema, normalizing to uppercase
pub fn resolve_columns(column_order: &[String]) -> LoadResult<Vec<&'static Column>> {
    if column_order.is_empty() {
        return Err(LoadError::InvalidIdentifier(
            "column list is empty".to_string(),
        ));
    }

    column_order
        .iter()
        .map(|name| {
            validate_identifier(name.trim(), false)?;
            schema::find_column(name).ok_or_else(|| LoadError::UnknownColumn(name.to_ascii_uppercase()))
        })
        .collect()
}

/// Check that `name` is a plain SQL identifier
///
/// Accepts `[A-Za-z_][A-Za-z0-9_]*`, and dot-separated parts when `qualified` is set.
pub fn validate_identifier(name: &str, qualified: bool) -> LoadResult<()> {
    let is_plain = |part: &str| {
        let mut chars = part.chars();
        matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    };

    let valid = if qualified {
        name.split('.').all(is_plain)
    } else {
        is_plain(name)
    };

    if valid {
        Ok(())
    } else {
        Err(LoadError::InvalidIdentifier(name.to_string()))
    }
}

/// Positional placeholder for parameter `index` (1-based), cast for the column type
pub fn placeholder(column_type: ColumnType, index: usize) -> String {
    match column_type {
        ColumnType::Text => format!("${index}::text"),
        ColumnType::Boolean => format!("${index}::boolean"),
        ColumnType::Timestamp => format!("${index}::text::timestamptz"),
        ColumnType::Date => format!("${index}::text::date"),
    }
}

/// Multi-row insert statement for `rows` rows
pub fn build_insert_sql(table_name: &str, columns: &[&Column], rows: usize) -> String {
    let column_list = columns
        .iter()
        .map(|c| c.name)
        .collect::<Vec<_>>()
        .join(", ");

    let width = columns.len();
    let values = (0..rows)
        .map(|row| {
            let cells = columns
                .iter()
                .enumerate()
                .map(|(col, column)| placeholder(column.column_type, row * width + col + 1))
                .collect::<Vec<_>>()
                .join(", ");
            format!("({cells})")
        })
        .collect::<Vec<_>>()
        .join(", ");

    format!("INSERT INTO {table_name} ({column_list}) VALUES {values}")
}
