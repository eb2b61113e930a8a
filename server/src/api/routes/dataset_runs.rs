//! Dataset run endpoints

use axum::Json;
use axum::extract::State;

use super::AppState;
use super::traces::TraceListQuery;
use crate::api::extractors::{DatasetRunPath, ValidatedQuery};
use crate::api::types::ApiError;
use crate::data::types::{DatasetRunRow, TraceRow};

pub async fn list_dataset_runs(
    State(state): State<AppState>,
) -> Result<Json<Vec<DatasetRunRow>>, ApiError> {
    let rows = state
        .repo
        .list_dataset_runs()
        .await
        .map_err(ApiError::from_data)?;
    Ok(Json(rows))
}

/// Traces linked to one dataset run
pub async fn list_dataset_run_traces(
    State(state): State<AppState>,
    path: DatasetRunPath,
    ValidatedQuery(query): ValidatedQuery<TraceListQuery>,
) -> Result<Json<Vec<TraceRow>>, ApiError> {
    let mut query = query.to_trace_query()?;
    query.dataset_run_id = Some(path.run_id);
    let rows = state
        .repo
        .list_traces(&query)
        .await
        .map_err(ApiError::from_data)?;
    Ok(Json(rows))
}
