//! LLM request (GENERATION span) listing

use axum::Json;
use axum::extract::{Query, State};
use serde::Deserialize;

use super::AppState;
use crate::api::types::{ApiError, lenient_pagination};
use crate::data::types::RequestRow;

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<String>,
    pub offset: Option<String>,
}

/// GENERATION spans, newest first
pub async fn list_requests(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Vec<RequestRow>>, ApiError> {
    let pagination = lenient_pagination(query.limit.as_deref(), query.offset.as_deref());
    let rows = state
        .repo
        .list_requests(&pagination)
        .await
        .map_err(ApiError::from_data)?;
    Ok(Json(rows))
}
