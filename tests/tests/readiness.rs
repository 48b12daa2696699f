//! Readiness follows the store health observed by the last check.

use axum::http::StatusCode;
use integration_tests::setup::TestContext;
use serde_json::Value;

#[tokio::test]
async fn test_readiness_tracks_store() {
    let ctx = TestContext::new().await;
    let server = ctx.server();

    ctx.set_store_failure(true);
    let report: Value = server.get("/health").await.json();
    assert_eq!(report["status"], "unhealthy");
    server
        .get("/health/ready")
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE);

    ctx.set_store_failure(false);
    let report: Value = server.get("/health").await.json();
    assert_ne!(report["status"], "unhealthy");
    server.get("/health/ready").await.assert_status_ok();
}
