//! Session API endpoints

use axum::Json;
use axum::extract::State;

use super::AppState;
use super::traces::TraceListQuery;
use crate::api::extractors::{SessionPath, ValidatedQuery};
use crate::api::types::ApiError;
use crate::data::types::{SessionRow, TraceRow};

pub async fn list_sessions(
    State(state): State<AppState>,
) -> Result<Json<Vec<SessionRow>>, ApiError> {
    let rows = state
        .repo
        .list_sessions()
        .await
        .map_err(ApiError::from_data)?;
    Ok(Json(rows))
}

/// Traces that contain at least one span of the session
pub async fn list_session_traces(
    State(state): State<AppState>,
    path: SessionPath,
    ValidatedQuery(query): ValidatedQuery<TraceListQuery>,
) -> Result<Json<Vec<TraceRow>>, ApiError> {
    let mut query = query.to_trace_query()?;
    query.session_id = Some(path.session_id);
    let rows = state
        .repo
        .list_traces(&query)
        .await
        .map_err(ApiError::from_data)?;
    Ok(Json(rows))
}
