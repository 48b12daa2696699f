//! Read endpoint tests: listing, type counts, stats, dashboard, realtime.

use axum::http::StatusCode;
use integration_tests::{fixtures, setup::TestContext};
use serde_json::Value;

async fn seed(server: &axum_test::TestServer, key: &str, events: Vec<Value>) {
    server
        .post("/api/events")
        .json(&fixtures::batch(key, events))
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_listing_is_newest_first_and_paginated() {
    let ctx = TestContext::new().await;
    let server = ctx.server();
    let key = fixtures::project_key();

    let events = (0..5)
        .map(|i| fixtures::bare_event("click", &format!("2024-01-01T10:00:0{}Z", i)))
        .collect();
    seed(&server, &key, events).await;

    let page: Value = server
        .get(&format!("/api/events?projectKey={}&page=1&pageSize=2", key))
        .await
        .json();
    assert_eq!(page["total"], 5);
    assert_eq!(page["page"], 1);
    assert_eq!(page["pageSize"], 2);
    assert_eq!(page["totalPages"], 3);
    assert_eq!(page["data"][0]["timestamp"], "2024-01-01T10:00:04.000Z");
    assert_eq!(page["data"][1]["timestamp"], "2024-01-01T10:00:03.000Z");
    assert!(page["data"][0]["event_data"].is_object());

    let last: Value = server
        .get(&format!("/api/events?projectKey={}&page=3&pageSize=2", key))
        .await
        .json();
    assert_eq!(last["data"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn test_listing_filters_and_clamps() {
    let ctx = TestContext::new().await;
    let server = ctx.server();
    let key = fixtures::project_key();

    seed(
        &server,
        &key,
        vec![
            fixtures::bare_event("click", "2024-01-01T10:00:00Z"),
            fixtures::bare_event("scroll", "2024-01-02T10:00:00Z"),
            fixtures::bare_event("click", "2024-01-03T10:00:00Z"),
        ],
    )
    .await;

    let clicks: Value = server
        .get(&format!("/api/events?projectKey={}&type=click&pageSize=500", key))
        .await
        .json();
    assert_eq!(clicks["total"], 2);
    assert_eq!(clicks["pageSize"], 100);

    let ranged: Value = server
        .get(&format!(
            "/api/events?projectKey={}&startTime=2024-01-02T00:00:00Z&endTime=2024-01-02T23:59:59Z",
            key
        ))
        .await
        .json();
    assert_eq!(ranged["total"], 1);
    assert_eq!(ranged["data"][0]["type"], "scroll");
}

#[tokio::test]
async fn test_listing_requires_project_key() {
    let ctx = TestContext::new().await;
    let server = ctx.server();

    let response = server.get("/api/events").await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "VALID_003");
}

#[tokio::test]
async fn test_bad_time_ranges() {
    let ctx = TestContext::new().await;
    let server = ctx.server();
    let key = fixtures::project_key();

    let inverted = server
        .get(&format!(
            "/api/events?projectKey={}&startTime=2024-02-01T00:00:00Z&endTime=2024-01-01T00:00:00Z",
            key
        ))
        .await;
    inverted.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(inverted.json::<Value>()["code"], "VALID_004");

    let garbage = server
        .get(&format!("/api/stats/{}?startTime=yesterday", key))
        .await;
    garbage.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(garbage.json::<Value>()["code"], "VALID_004");
}

#[tokio::test]
async fn test_type_counts_are_ordered() {
    let ctx = TestContext::new().await;
    let server = ctx.server();
    let key = fixtures::project_key();

    seed(
        &server,
        &key,
        vec![
            fixtures::bare_event("scroll", "2024-01-01T10:00:00Z"),
            fixtures::bare_event("click", "2024-01-01T10:00:01Z"),
            fixtures::bare_event("click", "2024-01-01T10:00:02Z"),
            fixtures::bare_event("error", "2024-01-01T10:00:03Z"),
        ],
    )
    .await;

    let counts: Value = server
        .get(&format!("/api/events/stats?projectKey={}", key))
        .await
        .json();
    let counts = counts.as_array().cloned().unwrap_or_default();
    assert_eq!(counts.len(), 3);
    assert_eq!(counts[0]["type"], "click");
    assert_eq!(counts[0]["count"], 2);
    assert_eq!(counts[1]["type"], "error");
    assert_eq!(counts[2]["type"], "scroll");
}

#[tokio::test]
async fn test_project_stats_for_unknown_project_are_empty() {
    let ctx = TestContext::new().await;
    let server = ctx.server();

    let response = server
        .get(&format!("/api/stats/{}", fixtures::project_key()))
        .await;
    response.assert_status_ok();
    let stats: Value = response.json();
    assert_eq!(stats["totalEvents"], 0);
    assert_eq!(stats["pageviews"], 0);
    assert_eq!(stats["topPages"].as_array().map(Vec::len), Some(0));
    assert!(stats["webVitals"]["lcp"].is_null());
}

#[tokio::test]
async fn test_dashboard() {
    let ctx = TestContext::new().await;
    let server = ctx.server();
    let key = fixtures::project_key();

    seed(&server, &key, fixtures::pageviews(3)).await;

    let board: Value = server
        .get(&format!("/api/stats/{}/dashboard?days=7", key))
        .await
        .json();
    assert_eq!(board["dailyStats"].as_array().map(Vec::len), Some(7));
    assert_eq!(board["totalPageViews"], 3);
    assert_eq!(board["totalUniqueVisitors"], 3);
    assert_eq!(board["realTimeVisitors"], 3);
    assert_eq!(board["avgLoadTime"], 900.0);
    assert_eq!(board["dailyStats"][6]["pageViews"], 3);

    // a second batch must show up despite the cached rollups
    let late = fixtures::pageview("/late", "10.0.0.9", &fixtures::now_iso());
    seed(&server, &key, vec![late]).await;
    let board: Value = server
        .get(&format!("/api/stats/{}/dashboard", key))
        .await
        .json();
    assert_eq!(board["totalPageViews"], 4);

    for days in ["0", "91", "-1"] {
        let response = server
            .get(&format!("/api/stats/{}/dashboard?days={}", key, days))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<Value>()["code"], "VALID_001");
    }
}

#[tokio::test]
async fn test_realtime() {
    let ctx = TestContext::new().await;
    let server = ctx.server();
    let key = fixtures::project_key();

    let now = fixtures::now_iso();
    let mut events = fixtures::pageviews(2);
    events.push(fixtures::bare_event("click", &now));
    events.push(fixtures::error_event("boom", "", &now));
    events.push(fixtures::pageview("/old", "10.0.0.2", "2020-01-01T00:00:00Z"));
    seed(&server, &key, events).await;

    let stats: Value = server
        .get(&format!("/api/analytics/realtime/{}?minutes=5", key))
        .await
        .json();
    assert_eq!(stats["minutes"], 5);
    assert_eq!(stats["current"]["pageviews"], 2);
    assert_eq!(stats["current"]["clicks"], 1);
    assert_eq!(stats["current"]["errors"], 1);
    assert_eq!(stats["current"]["visitors"], 2);
    assert!(!stats["timeline"].as_array().cloned().unwrap_or_default().is_empty());

    let default: Value = server
        .get(&format!("/api/analytics/realtime/{}", key))
        .await
        .json();
    assert_eq!(default["minutes"], 5);

    for bad in ["0", "abc"] {
        let response = server
            .get(&format!("/api/analytics/realtime/{}?minutes={}", key, bad))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<Value>()["code"], "VALID_001");
    }
}
