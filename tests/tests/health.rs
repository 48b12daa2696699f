//! Health and metrics endpoint tests.
//!
//! Health state is process-global; failure transitions live in
//! `readiness.rs` so they cannot race these assertions.

use integration_tests::{fixtures, setup::TestContext};
use serde_json::Value;

#[tokio::test]
async fn test_health_report_shape() {
    let ctx = TestContext::new().await;
    let server = ctx.server();

    let response = server.get("/health").await;
    response.assert_status_ok();
    let body: Value = response.json();

    assert!(body["status"].is_string());
    assert_eq!(body["components"].as_array().map(Vec::len), Some(2));
    assert_eq!(body["store_backend"], "mock");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_liveness_always_ok() {
    let ctx = TestContext::new().await;
    ctx.server().get("/health/live").await.assert_status_ok();
}

#[tokio::test]
async fn test_metrics_count_ingestion() {
    let ctx = TestContext::new().await;
    let server = ctx.server();
    let key = fixtures::project_key();

    server
        .post("/api/events")
        .json(&fixtures::batch(&key, fixtures::pageviews(3)))
        .await
        .assert_status_ok();

    let response = server.get("/metrics").await;
    response.assert_status_ok();
    let metrics: Value = response.json();

    assert!(metrics["events_received"].as_u64().unwrap_or(0) >= 3);
    assert!(metrics["events_saved"].as_u64().unwrap_or(0) >= 3);
    assert!(metrics["batches_received"].as_u64().unwrap_or(0) >= 1);
    assert!(metrics["ingest_latency"].is_object());
}
