//! End-to-end tests for the ingest pipeline.
//!
//! POST /api/events → Pipeline (normalize, assign ids) → MockStore, then
//! read back through the stats endpoints.

use integration_tests::{fixtures, setup::TestContext};
use serde_json::{json, Value};

/// Ingest one page view, read it straight back.
#[tokio::test]
async fn test_single_pageview_round_trip() {
    let ctx = TestContext::new().await;
    let server = ctx.server();
    let key = fixtures::project_key();

    let response = server
        .post("/api/events")
        .json(&json!({
            "projectKey": key,
            "events": [{
                "type": "pageview",
                "timestamp": "2024-01-01T10:00:00Z",
                "page": { "url": "/a" },
                "user": { "ip": "1.1.1.1" }
            }]
        }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["savedCount"], 1);
    assert_eq!(body["totalRequested"], 1);

    let stats: Value = server.get(&format!("/api/stats/{}", key)).await.json();
    assert_eq!(stats["pageviews"], 1);
    assert_eq!(stats["totalEvents"], 1);
    assert_eq!(stats["topPages"].as_array().map(Vec::len), Some(1));
    assert_eq!(stats["topPages"][0]["url"], "/a");
    assert_eq!(stats["topPages"][0]["count"], 1);
    assert_eq!(stats["timeTrend"][0]["time"], "2024-01-01 10:00");
}

/// Stored records carry canonical timestamps and derived fields.
#[tokio::test]
async fn test_records_are_normalized() {
    let ctx = TestContext::new().await;
    let server = ctx.server();
    let key = fixtures::project_key();

    server
        .post("/api/events")
        .json(&fixtures::batch(
            &key,
            vec![fixtures::pageview(
                "https://shop.example.com/cart?x=1",
                "2.2.2.2",
                "2024-01-01T11:00:00+01:00",
            )],
        ))
        .await
        .assert_status_ok();

    let stored = ctx.stored(&key).await;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].timestamp, "2024-01-01T10:00:00.000Z");
    assert_eq!(stored[0].page_path, "/cart");
    assert_eq!(stored[0].page_host, "shop.example.com");
    assert_eq!(stored[0].screen_width, 1920);
    assert_eq!(stored[0].project_key, key);
}

/// Extreme inputs are clamped, never rejected.
#[tokio::test]
async fn test_sanitization_bounds() {
    let ctx = TestContext::new().await;
    let server = ctx.server();
    let key = fixtures::project_key();

    let response = server
        .post("/api/events")
        .json(&fixtures::batch(
            &key,
            vec![json!({
                "type": "pageview",
                "page": { "url": "u".repeat(1_000_000), "title": "t".repeat(1_000) },
                "user": { "screenWidth": -5, "screenHeight": 10_000_000 }
            })],
        ))
        .await;
    response.assert_status_ok();

    let stored = ctx.stored(&key).await;
    assert_eq!(stored[0].page_url.chars().count(), 500);
    assert_eq!(stored[0].page_title.chars().count(), 200);
    assert_eq!(stored[0].screen_width, 0);
    assert_eq!(stored[0].screen_height, 99_999);
}

/// Ids keep increasing across batches.
#[tokio::test]
async fn test_ids_are_monotonic() {
    let ctx = TestContext::new().await;
    let server = ctx.server();
    let key = fixtures::project_key();

    for _ in 0..3 {
        server
            .post("/api/events")
            .json(&fixtures::batch(&key, fixtures::pageviews(4)))
            .await
            .assert_status_ok();
    }

    let ids: Vec<u64> = ctx.stored(&key).await.iter().map(|r| r.id).collect();
    assert_eq!(ids.len(), 12);
    assert!(ids.windows(2).all(|w| w[0] < w[1]), "ids not increasing: {:?}", ids);
}

/// The same page view twice in one second counts once.
#[tokio::test]
async fn test_duplicate_pageviews_are_collapsed() {
    let ctx = TestContext::new().await;
    let server = ctx.server();
    let key = fixtures::project_key();
    let event = fixtures::pageview("/landing", "3.3.3.3", "2024-01-01T10:00:00.250Z");
    let twin = fixtures::pageview("/landing", "3.3.3.3", "2024-01-01T10:00:00.750Z");

    server
        .post("/api/events")
        .json(&fixtures::batch(&key, vec![event, twin]))
        .await
        .assert_status_ok();

    let stats: Value = server.get(&format!("/api/stats/{}", key)).await.json();
    assert_eq!(stats["totalEvents"], 2);
    assert_eq!(stats["pageviews"], 1);
    assert_eq!(stats["topPages"][0]["count"], 1);
    assert_eq!(stats["webVitals"]["lcp"]["count"], 1);
    assert_eq!(stats["deviceStats"]["browsers"]["Chrome"], 1);
}

/// Errors with one message form one group.
#[tokio::test]
async fn test_errors_cluster_by_message() {
    let ctx = TestContext::new().await;
    let server = ctx.server();
    let key = fixtures::project_key();

    let events = (0..3)
        .map(|i| {
            fixtures::error_event(
                "TypeError: x is undefined",
                &format!("at handler (app.js:{}:1)", i),
                &format!("2024-01-01T10:00:0{}Z", i),
            )
        })
        .collect();
    server
        .post("/api/events")
        .json(&fixtures::batch(&key, events))
        .await
        .assert_status_ok();

    let stats: Value = server.get(&format!("/api/stats/{}", key)).await.json();
    let groups = stats["topErrors"].as_array().cloned().unwrap_or_default();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0]["count"], 3);
    assert_eq!(groups[0]["samples"].as_array().map(Vec::len), Some(3));
    assert_eq!(groups[0]["firstSeen"], "2024-01-01T10:00:00.000Z");
    assert_eq!(groups[0]["lastSeen"], "2024-01-01T10:00:02.000Z");
}

/// Exactly 1000 events is accepted.
#[tokio::test]
async fn test_max_batch_accepted() {
    let ctx = TestContext::new().await;
    let server = ctx.server();
    let key = fixtures::project_key();

    let response = server
        .post("/api/events")
        .json(&fixtures::batch(&key, fixtures::pageviews(1000)))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["savedCount"], 1000);
    assert_eq!(ctx.stored(&key).await.len(), 1000);
}

/// Elements that are not event objects are skipped, the rest saved. Events
/// with a non-object `user` block keep their other fields.
#[tokio::test]
async fn test_malformed_elements_reduce_saved_count() {
    let ctx = TestContext::new().await;
    let server = ctx.server();
    let key = fixtures::project_key();

    let response = server
        .post("/api/events")
        .json(&fixtures::batch(
            &key,
            vec![
                fixtures::bare_event("click", "2024-01-01T10:00:00Z"),
                json!(5),
                json!("pageview"),
                json!({ "type": "pageview", "user": ["not", "an", "object"] }),
            ],
        ))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["savedCount"], 2);
    assert_eq!(body["totalRequested"], 4);

    let stored = ctx.stored(&key).await;
    assert_eq!(stored[1].event_type, "pageview");
    assert_eq!(stored[1].user_ip, "");
}
