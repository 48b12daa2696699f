//! API routes.

pub mod events;
pub mod health;
pub mod ingest;
pub mod realtime;
pub mod stats;

use axum::{
    extract::rejection::QueryRejection,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::middleware::rate_limit::rate_limit;
use crate::response::ApiError;
use crate::state::AppState;

/// Creates the API router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // only ingestion is rate limited; the layer covers methods routed before it
    let events_route = post(ingest::ingest_handler)
        .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit))
        .get(events::list_handler);

    Router::new()
        .route("/api/events", events_route)
        .route("/api/events/stats", get(events::type_stats_handler))
        .route("/api/stats/:project_key", get(stats::project_stats_handler))
        .route("/api/stats/:project_key/dashboard", get(stats::dashboard_handler))
        .route(
            "/api/analytics/realtime/:project_key",
            get(realtime::realtime_handler),
        )
        .route("/health", get(health::health_handler))
        .route("/health/ready", get(health::ready_handler))
        .route("/health/live", get(health::live_handler))
        .route("/metrics", get(health::metrics_handler))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Malformed query strings get the coded JSON error, not axum's plain text.
pub(crate) fn query_error(rejection: QueryRejection) -> ApiError {
    ApiError::bad_request(rejection.body_text())
}
