//! Rate limiting middleware.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use engine_core::error::RateLimitErrorCode;
use engine_core::Error;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use telemetry::metrics;
use tracing::warn;

use crate::extractors::ClientIp;
use crate::response::ApiError;
use crate::state::AppState;

/// Buckets idle this long are dropped by [`RateLimiter::cleanup_stale`].
const STALE_AFTER: Duration = Duration::from_secs(600);

/// Token bucket rate limiter.
pub struct RateLimiter {
    buckets: Mutex<HashMap<String, TokenBucket>>,
    config: RateLimitConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Requests per second
    pub rate: u32,
    /// Burst size
    pub burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            rate: 50,
            burst: 200,
        }
    }
}

struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(burst: u32) -> Self {
        Self {
            tokens: burst as f64,
            last_update: Instant::now(),
        }
    }

    fn try_acquire(&mut self, rate: u32, burst: u32) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update).as_secs_f64();
        self.last_update = now;

        self.tokens = (self.tokens + elapsed * rate as f64).min(burst as f64);

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// Check if request is allowed for the given key.
    pub fn check(&self, key: &str) -> bool {
        let mut buckets = self.buckets.lock();

        let bucket = buckets
            .entry(key.to_string())
            .or_insert_with(|| TokenBucket::new(self.config.burst));

        bucket.try_acquire(self.config.rate, self.config.burst)
    }

    /// Seconds until one token is back.
    pub fn retry_after_secs(&self) -> u64 {
        if self.config.rate == 0 {
            return 60;
        }
        (1.0 / self.config.rate as f64).ceil().max(1.0) as u64
    }

    /// Clean up buckets idle longer than `max_age`. Returns how many were
    /// removed.
    pub fn cleanup(&self, max_age: Duration) -> usize {
        let mut buckets = self.buckets.lock();
        let now = Instant::now();
        let before = buckets.len();

        buckets.retain(|_, bucket| now.duration_since(bucket.last_update) < max_age);
        before - buckets.len()
    }

    pub fn cleanup_stale(&self) -> usize {
        self.cleanup(STALE_AFTER)
    }

    pub fn tracked_clients(&self) -> usize {
        self.buckets.lock().len()
    }
}

/// Shared rate limiter state.
pub type SharedRateLimiter = Arc<RateLimiter>;

/// Rejects requests from clients that ran out of tokens.
pub async fn rate_limit(
    State(state): State<AppState>,
    ClientIp(client_ip): ClientIp,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if !state.rate_limiter.check(&client_ip) {
        metrics().rate_limited_requests.inc();
        warn!(client_ip = %client_ip, "Rate limit exceeded");
        return Err(Error::rate_limit(
            RateLimitErrorCode::Exceeded,
            "too many requests",
            Some(state.rate_limiter.retry_after_secs()),
        )
        .into());
    }

    Ok(next.run(request).await)
}
