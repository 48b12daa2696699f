//! Error handling tests for the ingest endpoint.
//!
//! Request-level problems are rejected before anything is stored; store
//! failures surface as server errors.

use axum::http::StatusCode;
use bytes::Bytes;
use integration_tests::{fixtures, setup::TestContext};
use serde_json::{json, Value};

fn code(body: &Value) -> &str {
    body["code"].as_str().unwrap_or("")
}

/// 1001 events is rejected whole.
#[tokio::test]
async fn test_oversized_batch_rejected() {
    let ctx = TestContext::new().await;
    let server = ctx.server();
    let key = fixtures::project_key();

    let response = server
        .post("/api/events")
        .json(&fixtures::oversized_batch(&key))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(code(&body), "VALID_002");
    assert!(ctx.stored(&key).await.is_empty());
}

/// Bodies over the byte limit are rejected before parsing.
#[tokio::test]
async fn test_oversized_body_rejected() {
    let ctx = TestContext::new().await;
    let server = ctx.server();

    let response = server
        .post("/api/events")
        .content_type("application/json")
        .bytes(Bytes::from(vec![b' '; 1024 * 1024 + 1]))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(code(&response.json()), "VALID_002");
}

#[tokio::test]
async fn test_invalid_project_keys() {
    let ctx = TestContext::new().await;
    let server = ctx.server();

    for body in [
        json!({ "projectKey": "", "events": [] }),
        json!({ "projectKey": 42, "events": [] }),
        json!({ "events": [] }),
        json!({ "projectKey": "k".repeat(101), "events": [] }),
    ] {
        let response = server.post("/api/events").json(&body).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(code(&response.json()), "VALID_003", "body: {}", body);
    }
}

#[tokio::test]
async fn test_malformed_bodies() {
    let ctx = TestContext::new().await;
    let server = ctx.server();

    let response = server
        .post("/api/events")
        .content_type("application/json")
        .bytes(Bytes::from_static(b"{not json"))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(code(&response.json()), "VALID_001");

    let response = server
        .post("/api/events")
        .json(&json!({ "projectKey": "p1", "events": { "type": "pageview" } }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(code(&response.json()), "VALID_001");

    let response = server.post("/api/events").json(&json!([1, 2])).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(code(&response.json()), "VALID_001");
}

/// A failing store is a server error, and the ids it consumed stay burned.
#[tokio::test]
async fn test_store_failure() {
    let ctx = TestContext::new().await;
    let server = ctx.server();
    let key = fixtures::project_key();

    server
        .post("/api/events")
        .json(&fixtures::batch(&key, fixtures::pageviews(1)))
        .await
        .assert_status_ok();

    ctx.set_store_failure(true);
    let response = server
        .post("/api/events")
        .json(&fixtures::batch(&key, fixtures::pageviews(2)))
        .await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(code(&response.json()), "STORE_001");

    let response = server.get(&format!("/api/stats/{}", key)).await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);

    ctx.set_store_failure(false);
    server
        .post("/api/events")
        .json(&fixtures::batch(&key, fixtures::pageviews(1)))
        .await
        .assert_status_ok();

    let ids: Vec<u64> = ctx.stored(&key).await.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1, 4]);
}

/// Ingestion is limited per client IP; reads are not.
#[tokio::test]
async fn test_rate_limit() {
    let ctx = TestContext::with_rate_limit(api::middleware::rate_limit::RateLimitConfig {
        rate: 1,
        burst: 2,
    })
    .await;
    let server = ctx.server();
    let key = fixtures::project_key();
    let body = fixtures::batch(&key, fixtures::pageviews(1));

    for _ in 0..2 {
        server
            .post("/api/events")
            .add_header("X-Forwarded-For", "9.9.9.9")
            .json(&body)
            .await
            .assert_status_ok();
    }

    let response = server
        .post("/api/events")
        .add_header("X-Forwarded-For", "9.9.9.9")
        .json(&body)
        .await;
    response.assert_status(StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(code(&response.json()), "RATE_001");
    assert_eq!(response.header("retry-after").to_str().unwrap(), "1");

    // another client still has its own bucket
    server
        .post("/api/events")
        .add_header("X-Forwarded-For", "8.8.8.8")
        .json(&body)
        .await
        .assert_status_ok();

    server
        .get(&format!("/api/events?projectKey={}", key))
        .add_header("X-Forwarded-For", "9.9.9.9")
        .await
        .assert_status_ok();
}
