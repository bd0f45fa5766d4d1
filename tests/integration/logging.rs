//! Log output captured while the paginator retries and follows continuation links

use chrono::NaiveDate;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use ticker_loader::fetcher::http::PolygonHttpClient;
use ticker_loader::fetcher::pagination::Paginator;
use ticker_loader::fetcher::RawResponse;
use tracing_subscriber::EnvFilter;

use crate::support::{page, rate_limited, ScriptedTransport};

const API_KEY: &str = "test-key";

/// In-memory log sink shared with the subscriber
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn retry_then_continue() -> Vec<RawResponse> {
    vec![
        rate_limited(Some("3")),
        page(
            &["A", "AA"],
            Some("https://api.polygon.io/v3/reference/tickers?cursor=YWN0aXZl"),
        ),
        page(&["AAPL"], None),
    ]
}

async fn collect(responses: Vec<RawResponse>) -> usize {
    let client = PolygonHttpClient::new(ScriptedTransport::new(responses), 6);
    let paginator = Paginator::new(client, API_KEY, 100);
    let url = "https://api.polygon.io/v3/reference/tickers?market=stocks&limit=1000";
    paginator
        .collect_all_pages(url, NaiveDate::from_ymd_opt(2025, 9, 16).unwrap())
        .await
        .unwrap()
        .len()
}

#[tokio::test(start_paused = true)]
async fn test_retry_and_pagination_logs_redact_api_key() {
    let logs = CapturedLogs::default();
    let sink = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("ticker_loader=debug"))
        .with_ansi(false)
        .with_writer(move || sink.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    assert_eq!(collect(retry_then_continue()).await, 3);

    let output = logs.contents();
    assert!(output.contains("Retrying (attempt 1/6) after rate limit exceeded"), "{output}");
    assert!(output.contains("waiting 12.0 seconds"), "{output}");
    assert!(output.contains("Retry attempt 2/6 succeeded"), "{output}");
    assert!(output.contains("Requesting next page"), "{output}");
    assert!(output.contains("cursor=YWN0aXZl"), "{output}");
    assert!(output.contains("apiKey=REDACTED"), "{output}");
    assert!(!output.contains(API_KEY), "{output}");
}

#[tokio::test(start_paused = true)]
async fn test_json_log_lines_are_structured() {
    let logs = CapturedLogs::default();
    let sink = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::new("ticker_loader=info"))
        .with_writer(move || sink.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    collect(retry_then_continue()).await;

    let output = logs.contents();
    let lines: Vec<serde_json::Value> = output
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    let warn = lines
        .iter()
        .find(|line| line["level"] == "WARN")
        .expect("retry warning logged");
    assert!(warn["fields"]["message"]
        .as_str()
        .unwrap()
        .starts_with("Retrying (attempt 1/6)"));
    assert!(lines.iter().all(|line| line["level"] != "DEBUG"));
    assert!(!output.contains(API_KEY));
}

#[test]
fn test_default_filter_directives_parse() {
    for directive in [
        "ticker_loader=info",
        "warn,ticker_loader=debug",
        "ticker_loader::fetcher=debug,ticker_loader::loader=info",
    ] {
        assert!(EnvFilter::try_new(directive).is_ok(), "{directive}");
    }
}
