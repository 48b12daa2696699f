//! Realtime window endpoint.

use analytics::RealtimeStats;
use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    Json,
};
use engine_core::schema::{realtime_minutes, validate_project_key};
use serde::Deserialize;

use super::query_error;
use crate::response::ApiError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct RealtimeParams {
    pub minutes: Option<i64>,
}

/// GET /api/analytics/realtime/:project_key
pub async fn realtime_handler(
    State(state): State<AppState>,
    Path(project_key): Path<String>,
    params: Result<Query<RealtimeParams>, QueryRejection>,
) -> Result<Json<RealtimeStats>, ApiError> {
    let Query(params) = params.map_err(query_error)?;
    validate_project_key(&project_key)?;
    let minutes = realtime_minutes(params.minutes)?;

    Ok(Json(state.pipeline.realtime(&project_key, minutes).await?))
}
