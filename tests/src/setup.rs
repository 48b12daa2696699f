//! Common test setup functions.

use analytics::{Pipeline, PipelineConfig};
use api::middleware::rate_limit::RateLimitConfig;
use api::{router, state::AppState};
use axum::Router;
use axum_test::TestServer;
use engine_core::EventRecord;
use std::sync::Arc;

use crate::mocks::MockStore;

/// Test context wiring the real router to a [`MockStore`].
///
/// - Real Axum router with all middleware
/// - Real `Pipeline` (normalization, id allocation, aggregation)
/// - `MockStore` for storage, with a switchable failure mode
pub struct TestContext {
    pub store: Arc<MockStore>,
    pub pipeline: Arc<Pipeline>,
    pub router: Router,
}

impl TestContext {
    pub async fn new() -> Self {
        Self::with_rate_limit(RateLimitConfig::default()).await
    }

    pub async fn with_rate_limit(rate_config: RateLimitConfig) -> Self {
        let store = Arc::new(MockStore::new());
        let pipeline = Arc::new(
            Pipeline::new(store.clone(), PipelineConfig::default())
                .await
                .expect("Failed to build pipeline"),
        );
        let router = router(AppState::with_rate_limit(pipeline.clone(), rate_config));

        Self {
            store,
            pipeline,
            router,
        }
    }

    pub fn server(&self) -> TestServer {
        TestServer::new(self.router.clone()).expect("Failed to create test server")
    }

    /// Records stored for a project, in append order.
    pub async fn stored(&self, project_key: &str) -> Vec<EventRecord> {
        self.store.records(project_key).await
    }

    /// Set the mock store to fail (for error testing).
    pub fn set_store_failure(&self, should_fail: bool) {
        self.store.set_should_fail(should_fail);
    }
}
