//! Unit tests for CSV output

use chrono::NaiveDate;
use tempfile::TempDir;
use ticker_loader::output::csv::{read_tickers, write_tickers_csv, CsvTickerWriter};
use ticker_loader::output::{OutputWriter, TickersWriter};
use ticker_loader::TickerRecord;

fn sample_tickers() -> Vec<TickerRecord> {
    let run_date = NaiveDate::from_ymd_opt(2025, 9, 16).unwrap();
    vec![
        TickerRecord {
            ticker: Some("HUM".to_string()),
            name: Some("Humana Inc.".to_string()),
            market: Some("stocks".to_string()),
            locale: Some("us".to_string()),
            primary_exchange: Some("XNYS".to_string()),
            security_type: Some("CS".to_string()),
            active: Some(true),
            currency_name: Some("usd".to_string()),
            cik: Some("0000049071".to_string()),
            composite_figi: Some("BBG000BLKK03".to_string()),
            share_class_figi: Some("BBG001S5S1X6".to_string()),
            last_updated_utc: Some("2025-09-16T06:05:51.697381223Z".to_string()),
            run_date: Some(run_date),
        },
        // Sparse record: warrants and units often lack FIGIs and CIK
        TickerRecord {
            ticker: Some("ACAHW".to_string()),
            name: Some("Acri Capital Acquisition Corp, Warrants".to_string()),
            market: Some("stocks".to_string()),
            active: Some(false),
            run_date: Some(run_date),
            ..TickerRecord::default()
        },
    ]
}

#[test]
fn test_write_then_read_preserves_records() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("tickers.csv");
    let tickers = sample_tickers();

    let written = write_tickers_csv(&path, &tickers).unwrap();
    assert_eq!(written, 2);

    let read_back = read_tickers(&path).unwrap();
    assert_eq!(read_back, tickers);
}

#[test]
fn test_header_and_row_layout() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("tickers.csv");

    write_tickers_csv(&path, &sample_tickers()).unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    let mut lines = content.lines();
    assert_eq!(
        lines.next().unwrap(),
        "ticker,name,market,locale,primary_exchange,type,active,currency_name,cik,\
         composite_figi,share_class_figi,last_updated_utc,run_date"
    );
    assert_eq!(
        lines.next().unwrap(),
        "HUM,Humana Inc.,stocks,us,XNYS,CS,true,usd,0000049071,BBG000BLKK03,\
         BBG001S5S1X6,2025-09-16T06:05:51.697381223Z,2025-09-16"
    );
    // Comma inside the name is quoted
    assert_eq!(
        lines.next().unwrap(),
        "ACAHW,\"Acri Capital Acquisition Corp, Warrants\",stocks,,,,false,,,,,,2025-09-16"
    );
    assert!(lines.next().is_none());
}

#[test]
fn test_zero_records_writes_header_only() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("dir").join("tickers.csv");

    let written = write_tickers_csv(&path, &[]).unwrap();
    assert_eq!(written, 0);

    let content = std::fs::read_to_string(&path).unwrap();
    assert_eq!(content.lines().count(), 1);
    assert!(read_tickers(&path).unwrap().is_empty());
}

#[test]
fn test_existing_file_is_overwritten() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("tickers.csv");
    std::fs::write(&path, "stale contents from a previous run\n").unwrap();

    let mut writer = CsvTickerWriter::new(&path).unwrap();
    writer.write_ticker(&sample_tickers()[0]).unwrap();
    assert_eq!(writer.tickers_written(), 1);
    writer.close().unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    assert!(!content.contains("stale"));
    assert_eq!(read_tickers(&path).unwrap().len(), 1);
}
