//! Event listing and per-type counts.

use analytics::{EventPage, EventQuery, TypeCount};
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use engine_core::schema::validate_project_key;
use engine_core::{Pagination, TimeRange};
use serde::Deserialize;

use super::query_error;
use crate::response::ApiError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub project_key: Option<String>,
    #[serde(rename = "type")]
    pub event_type: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeStatsParams {
    pub project_key: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

fn required_project_key(key: Option<String>) -> Result<String, ApiError> {
    let key = key.unwrap_or_default();
    validate_project_key(&key)?;
    Ok(key)
}

/// GET /api/events
pub async fn list_handler(
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<EventPage>, ApiError> {
    let Query(params) = params.map_err(query_error)?;

    let query = EventQuery {
        project_key: required_project_key(params.project_key)?,
        event_type: params.event_type,
        range: TimeRange::parse(params.start_time.as_deref(), params.end_time.as_deref())?,
        pagination: Pagination::new(params.page, params.page_size),
    };

    Ok(Json(state.pipeline.list_events(query).await?))
}

/// GET /api/events/stats
pub async fn type_stats_handler(
    State(state): State<AppState>,
    params: Result<Query<TypeStatsParams>, QueryRejection>,
) -> Result<Json<Vec<TypeCount>>, ApiError> {
    let Query(params) = params.map_err(query_error)?;

    let project_key = required_project_key(params.project_key)?;
    let range = TimeRange::parse(params.start_time.as_deref(), params.end_time.as_deref())?;

    Ok(Json(state.pipeline.event_type_stats(&project_key, range).await?))
}
