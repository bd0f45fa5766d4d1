//! Explicit column schema for [`TickerRecord`]
//!
//! The CSV header, the loader's projection and column validation all read from
//! [`TICKER_COLUMNS`]. Names are stored in the warehouse's canonical uppercase form.

use crate::TickerRecord;

/// Warehouse-side type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// Free text (VARCHAR)
    Text,
    /// Strict boolean
    Boolean,
    /// Timestamp string parsed by the warehouse
    Timestamp,
    /// Calendar date string (YYYY-MM-DD) parsed by the warehouse
    Date,
}

/// [`TickerRecord`] field a column projects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum TickerField {
    Ticker,
    Name,
    Market,
    Locale,
    PrimaryExchange,
    SecurityType,
    Active,
    CurrencyName,
    Cik,
    CompositeFigi,
    ShareClassFigi,
    LastUpdatedUtc,
    RunDate,
}

/// A named, typed column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    /// Canonical uppercase column name
    pub name: &'static str,
    /// Column type
    pub column_type: ColumnType,
    /// Record field bound for this column
    pub field: TickerField,
}

impl Column {
    const fn new(name: &'static str, column_type: ColumnType, field: TickerField) -> Self {
        Self {
            name,
            column_type,
            field,
        }
    }

    /// Lowercase name as used in the CSV header and API payloads
    pub fn field_name(&self) -> String {
        self.name.to_ascii_lowercase()
    }
}

/// Ticker columns in load order
pub const TICKER_COLUMNS: [Column; 13] = [
    Column::new("TICKER", ColumnType::Text, TickerField::Ticker),
    Column::new("NAME", ColumnType::Text, TickerField::Name),
    Column::new("MARKET", ColumnType::Text, TickerField::Market),
    Column::new("LOCALE", ColumnType::Text, TickerField::Locale),
    Column::new("PRIMARY_EXCHANGE", ColumnType::Text, TickerField::PrimaryExchange),
    Column::new("TYPE", ColumnType::Text, TickerField::SecurityType),
    Column::new("ACTIVE", ColumnType::Boolean, TickerField::Active),
    Column::new("CURRENCY_NAME", ColumnType::Text, TickerField::CurrencyName),
    Column::new("CIK", ColumnType::Text, TickerField::Cik),
    Column::new("COMPOSITE_FIGI", ColumnType::Text, TickerField::CompositeFigi),
    Column::new("SHARE_CLASS_FIGI", ColumnType::Text, TickerField::ShareClassFigi),
    Column::new("LAST_UPDATED_UTC", ColumnType::Timestamp, TickerField::LastUpdatedUtc),
    Column::new("RUN_DATE", ColumnType::Date, TickerField::RunDate),
];

/// Look up a column by name, ignoring case
pub fn find_column(name: &str) -> Option<&'static Column> {
    let normalized = name.trim().to_ascii_uppercase();
    TICKER_COLUMNS.iter().find(|c| c.name == normalized)
}

/// Canonical column names in load order
pub fn column_names() -> Vec<String> {
    TICKER_COLUMNS.iter().map(|c| c.name.to_string()).collect()
}

/// CSV header row
pub fn csv_header() -> Vec<String> {
    TICKER_COLUMNS.iter().map(Column::field_name).collect()
}

/// A projected field value ready to be bound as a statement parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellValue {
    /// Text value, NULL when `None`
    Text(Option<String>),
    /// Boolean value, NULL when `None`
    Bool(Option<bool>),
}

impl TickerRecord {
    /// Value of `column` for this record
    pub fn cell(&self, column: &Column) -> CellValue {
        let text = |v: &Option<String>| CellValue::Text(v.clone());
        match column.field {
            TickerField::Ticker => text(&self.ticker),
            TickerField::Name => text(&self.name),
            TickerField::Market => text(&self.market),
            TickerField::Locale => text(&self.locale),
            TickerField::PrimaryExchange => text(&self.primary_exchange),
            TickerField::SecurityType => text(&self.security_type),
            TickerField::Active => CellValue::Bool(self.active),
            TickerField::CurrencyName => text(&self.currency_name),
            TickerField::Cik => text(&self.cik),
            TickerField::CompositeFigi => text(&self.composite_figi),
            TickerField::ShareClassFigi => text(&self.share_class_figi),
            TickerField::LastUpdatedUtc => text(&self.last_updated_utc),
            TickerField::RunDate => CellValue::Text(
                self.run_date.map(|d| d.format("%Y-%m-%d").to_string()),
            ),
        }
    }
}
