//! Ingestion endpoint handler.

use axum::{body::Bytes, extract::State, Json};
use engine_core::IngestRequest;
use telemetry::metrics;
use tracing::{debug, info};

use crate::extractors::ClientIp;
use crate::response::{ApiError, IngestResponse};
use crate::state::AppState;

/// POST /api/events - Batch ingestion.
///
/// Takes the raw body so the size limit is enforced before any JSON is
/// parsed.
pub async fn ingest_handler(
    State(state): State<AppState>,
    ClientIp(client_ip): ClientIp,
    body: Bytes,
) -> Result<Json<IngestResponse>, ApiError> {
    debug!(client_ip = %client_ip, payload_size = body.len(), "Received event batch");

    let request = IngestRequest::parse(&body).map_err(|e| {
        metrics().batches_received.inc();
        metrics().batches_rejected.inc();
        debug!(error = %e, "Rejected event batch");
        e
    })?;

    let project_key = request.project_key.clone();
    let outcome = state.pipeline.ingest(request).await?;

    info!(
        project_key = %project_key,
        saved = outcome.saved_count,
        requested = outcome.total_requested,
        "Batch processed"
    );

    Ok(Json(outcome.into()))
}
