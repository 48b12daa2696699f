//! Application state shared across handlers.

use crate::middleware::rate_limit::{RateLimitConfig, RateLimiter, SharedRateLimiter};
use analytics::Pipeline;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// How often idle rate-limit buckets are swept.
const RATE_LIMIT_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Ingest and query service over the event store
    pub pipeline: Arc<Pipeline>,
    /// Per-client-IP limiter for the ingestion endpoint
    pub rate_limiter: SharedRateLimiter,
}

impl AppState {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self::with_rate_limit(pipeline, RateLimitConfig::default())
    }

    /// Create with custom rate limit config.
    pub fn with_rate_limit(pipeline: Arc<Pipeline>, rate_config: RateLimitConfig) -> Self {
        Self {
            pipeline,
            rate_limiter: Arc::new(RateLimiter::new(rate_config)),
        }
    }

    /// Start the rate limiter cleanup background task.
    /// Returns a handle that can be used to cancel the task.
    pub fn start_rate_limiter_cleanup(&self) -> tokio::task::JoinHandle<()> {
        let rate_limiter = self.rate_limiter.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(RATE_LIMIT_SWEEP_INTERVAL);
            loop {
                interval.tick().await;
                let removed = rate_limiter.cleanup_stale();
                if removed > 0 {
                    debug!(removed, "Swept idle rate limit buckets");
                }
            }
        })
    }
}
