//! Project statistics and the rollup dashboard.

use analytics::{Dashboard, ProjectStats};
use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    Json,
};
use engine_core::schema::{dashboard_days, validate_project_key};
use engine_core::TimeRange;
use serde::Deserialize;

use super::query_error;
use crate::response::ApiError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeParams {
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DashboardParams {
    pub days: Option<i64>,
}

/// GET /api/stats/:project_key
pub async fn project_stats_handler(
    State(state): State<AppState>,
    Path(project_key): Path<String>,
    params: Result<Query<RangeParams>, QueryRejection>,
) -> Result<Json<ProjectStats>, ApiError> {
    let Query(params) = params.map_err(query_error)?;
    validate_project_key(&project_key)?;
    let range = TimeRange::parse(params.start_time.as_deref(), params.end_time.as_deref())?;

    Ok(Json(state.pipeline.project_stats(&project_key, range).await?))
}

/// GET /api/stats/:project_key/dashboard
pub async fn dashboard_handler(
    State(state): State<AppState>,
    Path(project_key): Path<String>,
    params: Result<Query<DashboardParams>, QueryRejection>,
) -> Result<Json<Dashboard>, ApiError> {
    let Query(params) = params.map_err(query_error)?;
    validate_project_key(&project_key)?;
    let days = dashboard_days(params.days)?;

    Ok(Json(state.pipeline.dashboard(&project_key, days).await?))
}
