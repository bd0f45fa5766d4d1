//! Unit tests for PolygonHttpClient retry behavior
//!
//! Runs on tokio's paused clock so rate-limit sleeps complete instantly while
//! still advancing `Instant::now()` by the requested amount.

use serde_json::Value;
use std::time::Duration;
use ticker_loader::fetcher::http::PolygonHttpClient;
use ticker_loader::fetcher::FetcherError;
use tokio::time::Instant;

use crate::support::{ok_json, rate_limited, status, ScriptedTransport};

const URL: &str = "https://api.polygon.io/v3/reference/tickers?market=stocks&apiKey=test-key";

fn build_client(responses: Vec<ticker_loader::fetcher::RawResponse>, max_retries: u32) -> PolygonHttpClient<ScriptedTransport> {
    PolygonHttpClient::new(ScriptedTransport::new(responses), max_retries)
}

fn assert_waited(elapsed: Duration, secs: u64) {
    assert!(
        elapsed >= Duration::from_secs(secs) && elapsed < Duration::from_secs(secs) + Duration::from_millis(100),
        "expected ~{secs}s wait, got {elapsed:?}"
    );
}

#[tokio::test(start_paused = true)]
async fn test_success_on_first_attempt() {
    let client = build_client(vec![ok_json(serde_json::json!({"status": "OK"}))], 6);

    let start = Instant::now();
    let body: Value = client.fetch_json(URL).await.unwrap();

    assert_eq!(body["status"], "OK");
    assert_eq!(client.transport().request_count(), 1);
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn test_retry_after_below_floor_waits_twelve_seconds() {
    let client = build_client(
        vec![rate_limited(Some("5")), ok_json(serde_json::json!({"ok": true}))],
        6,
    );

    let start = Instant::now();
    let body: Value = client.fetch_json(URL).await.unwrap();

    assert_eq!(body["ok"], true);
    assert_eq!(client.transport().request_count(), 2);
    assert_waited(start.elapsed(), 12);
}

#[tokio::test(start_paused = true)]
async fn test_retry_after_above_floor_is_honored() {
    let client = build_client(
        vec![rate_limited(Some("30")), ok_json(serde_json::json!({}))],
        6,
    );

    let start = Instant::now();
    let _: Value = client.fetch_json(URL).await.unwrap();

    assert_waited(start.elapsed(), 30);
}

#[tokio::test(start_paused = true)]
async fn test_missing_or_invalid_retry_after_waits_floor() {
    let client = build_client(
        vec![
            rate_limited(None),
            rate_limited(Some("Wed, 21 Oct 2015 07:28:00 GMT")),
            ok_json(serde_json::json!({})),
        ],
        6,
    );

    let start = Instant::now();
    let _: Value = client.fetch_json(URL).await.unwrap();

    assert_eq!(client.transport().request_count(), 3);
    assert_waited(start.elapsed(), 24);
}

#[tokio::test(start_paused = true)]
async fn test_retry_exhausted_after_max_attempts() {
    let mut responses: Vec<_> = (0..6).map(|_| rate_limited(Some("1"))).collect();
    // Never requested: the client must stop after the sixth 429
    responses.push(ok_json(serde_json::json!({})));
    let client = build_client(responses, 6);

    let start = Instant::now();
    let err = client.fetch_json::<Value>(URL).await.unwrap_err();

    match err {
        FetcherError::RetryExhausted { url, attempts } => {
            assert_eq!(attempts, 6);
            assert!(url.contains("apiKey=REDACTED"));
            assert!(!url.contains("test-key"));
        }
        other => panic!("expected RetryExhausted, got {other:?}"),
    }
    assert_eq!(client.transport().request_count(), 6);
    assert_eq!(client.transport().remaining(), 1);
    // Five sleeps between six attempts, none after the last
    assert_waited(start.elapsed(), 60);
}

#[tokio::test(start_paused = true)]
async fn test_custom_max_retries() {
    let client = build_client(
        vec![rate_limited(None), rate_limited(None), ok_json(serde_json::json!({}))],
        2,
    );

    let err = client.fetch_json::<Value>(URL).await.unwrap_err();
    assert!(matches!(err, FetcherError::RetryExhausted { attempts: 2, .. }));
    assert_eq!(client.transport().request_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_server_error_is_not_retried() {
    let client = build_client(
        vec![status(503, "upstream unavailable"), ok_json(serde_json::json!({}))],
        6,
    );

    let start = Instant::now();
    let err = client.fetch_json::<Value>(URL).await.unwrap_err();

    match err {
        FetcherError::FatalHttp { status, body, url } => {
            assert_eq!(status, 503);
            assert_eq!(body, "upstream unavailable");
            assert!(!url.contains("test-key"));
        }
        other => panic!("expected FatalHttp, got {other:?}"),
    }
    assert_eq!(client.transport().request_count(), 1);
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn test_auth_error_is_fatal() {
    let client = build_client(vec![status(401, r#"{"status":"ERROR"}"#)], 6);

    let err = client.fetch_json::<Value>(URL).await.unwrap_err();
    assert!(matches!(err, FetcherError::FatalHttp { status: 401, .. }));
}

#[tokio::test]
async fn test_unparseable_body_is_parse_error() {
    let client = build_client(vec![status(200, "<html>maintenance</html>")], 6);

    let err = client.fetch_json::<Value>(URL).await.unwrap_err();
    assert!(matches!(err, FetcherError::Parse(_)));
}

#[tokio::test]
async fn test_network_error_is_not_retried() {
    let transport = ScriptedTransport::from_results(vec![
        Err(FetcherError::Network("connection refused".to_string())),
        Ok(ok_json(serde_json::json!({}))),
    ]);
    let client = PolygonHttpClient::new(transport, 6);

    let err = client.fetch_json::<Value>(URL).await.unwrap_err();
    assert!(matches!(err, FetcherError::Network(_)));
    assert_eq!(client.transport().request_count(), 1);
}
