//! Unit tests for cursor pagination

use chrono::NaiveDate;
use ticker_loader::fetcher::http::PolygonHttpClient;
use ticker_loader::fetcher::pagination::Paginator;
use ticker_loader::fetcher::FetcherError;

use crate::support::{ok_json, page, status, ScriptedTransport};

const BASE_URL: &str =
    "https://api.polygon.io/v3/reference/tickers?market=stocks&active=true&order=asc&limit=1000&sort=ticker";

fn run_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 9, 16).unwrap()
}

fn build_paginator(responses: Vec<ticker_loader::fetcher::RawResponse>, max_pages: usize) -> Paginator<ScriptedTransport> {
    let client = PolygonHttpClient::new(ScriptedTransport::new(responses), 6);
    Paginator::new(client, "test-key", max_pages)
}

fn cursor_url(cursor: &str) -> String {
    format!("https://api.polygon.io/v3/reference/tickers?cursor={cursor}")
}

#[tokio::test]
async fn test_follows_next_url_until_absent() {
    let paginator = build_paginator(
        vec![
            page(&["A", "AA"], Some(cursor_url("p2").as_str())),
            page(&["AAL", "AAPL"], Some(cursor_url("p3").as_str())),
            page(&["ABBV"], None),
        ],
        100,
    );

    let records = paginator.collect_all_pages(BASE_URL, run_date()).await.unwrap();

    let symbols: Vec<_> = records.iter().filter_map(|r| r.ticker.as_deref()).collect();
    assert_eq!(symbols, vec!["A", "AA", "AAL", "AAPL", "ABBV"]);
    assert!(records.iter().all(|r| r.run_date == Some(run_date())));

    let requests = paginator.client().transport().requests();
    assert_eq!(requests.len(), 3);
    assert!(requests[0].starts_with(BASE_URL));
    assert!(requests[1].contains("cursor=p2"));
    assert!(requests[2].contains("cursor=p3"));
    assert!(requests.iter().all(|url| url.contains("apiKey=test-key")));
}

#[tokio::test]
async fn test_empty_and_missing_results() {
    let paginator = build_paginator(vec![page(&[], None)], 100);
    let records = paginator.collect_all_pages(BASE_URL, run_date()).await.unwrap();
    assert!(records.is_empty());

    let paginator = build_paginator(
        vec![ok_json(serde_json::json!({"status": "OK", "count": 0}))],
        100,
    );
    let records = paginator.collect_all_pages(BASE_URL, run_date()).await.unwrap();
    assert!(records.is_empty());
    assert_eq!(paginator.client().transport().request_count(), 1);
}

#[tokio::test]
async fn test_null_results_still_follow_continuation() {
    let paginator = build_paginator(
        vec![
            ok_json(serde_json::json!({"results": null, "next_url": cursor_url("p2")})),
            page(&["MSFT"], Some("")),
        ],
        100,
    );

    let records = paginator.collect_all_pages(BASE_URL, run_date()).await.unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].ticker.as_deref(), Some("MSFT"));
    assert_eq!(paginator.client().transport().request_count(), 2);
}

#[tokio::test]
async fn test_page_limit_exceeded() {
    let responses = (0..5)
        .map(|i| page(&["X"], Some(cursor_url(&format!("p{}", i + 2)).as_str())))
        .collect();
    let paginator = build_paginator(responses, 3);

    let err = paginator
        .collect_all_pages(BASE_URL, run_date())
        .await
        .unwrap_err();

    match err {
        FetcherError::PageLimitExceeded { max_pages, next_url } => {
            assert_eq!(max_pages, 3);
            assert!(next_url.contains("cursor=p4"));
        }
        other => panic!("expected PageLimitExceeded, got {other:?}"),
    }
    assert_eq!(paginator.client().transport().request_count(), 3);
}

#[tokio::test]
async fn test_last_allowed_page_without_continuation_succeeds() {
    let paginator = build_paginator(
        vec![page(&["A"], Some(cursor_url("p2").as_str())), page(&["B"], None)],
        2,
    );

    let records = paginator.collect_all_pages(BASE_URL, run_date()).await.unwrap();
    assert_eq!(records.len(), 2);
}

#[tokio::test]
async fn test_failure_mid_pagination_propagates() {
    let paginator = build_paginator(
        vec![
            page(&["A"], Some(cursor_url("p2").as_str())),
            status(500, "internal error"),
            page(&["B"], None),
        ],
        100,
    );

    let err = paginator
        .collect_all_pages(BASE_URL, run_date())
        .await
        .unwrap_err();

    assert!(matches!(err, FetcherError::FatalHttp { status: 500, .. }));
    assert_eq!(paginator.client().transport().request_count(), 2);
}

#[tokio::test]
async fn test_existing_api_key_is_replaced() {
    let paginator = build_paginator(vec![page(&["A"], None)], 100);
    let url = format!("{BASE_URL}&apiKey=stale");

    paginator.collect_all_pages(&url, run_date()).await.unwrap();

    let requests = paginator.client().transport().requests();
    assert!(!requests[0].contains("stale"));
    assert_eq!(requests[0].matches("apiKey=").count(), 1);
    assert!(requests[0].ends_with("apiKey=test-key"));
}

#[tokio::test]
async fn test_malformed_active_flag_does_not_fail_page() {
    let mut odd = crate::support::ticker_json("ODD");
    odd["active"] = serde_json::json!("sometimes");
    let paginator = build_paginator(
        vec![ok_json(serde_json::json!({
            "results": [crate::support::ticker_json("A"), odd],
        }))],
        100,
    );

    let records = paginator.collect_all_pages(BASE_URL, run_date()).await.unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].active, Some(true));
    assert_eq!(records[1].ticker.as_deref(), Some("ODD"));
    assert_eq!(records[1].active, None);
}
