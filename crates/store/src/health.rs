//! Event store health checks.

use crate::store::EventStore;
use telemetry::health;
use tracing::{debug, error};

/// Probes the store and records the result in the global health registry.
pub async fn check_store(store: &dyn EventStore) -> bool {
    match store.ping().await {
        Ok(()) => {
            debug!(backend = store.backend(), "Event store healthy");
            health().store.set_healthy();
            true
        }
        Err(e) => {
            error!(backend = store.backend(), error = %e, "Event store health check failed");
            health().store.set_unhealthy(e.to_string());
            false
        }
    }
}
