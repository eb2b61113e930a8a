//! Span API endpoints

use axum::Json;
use axum::extract::State;
use serde::Deserialize;
use validator::Validate;

use super::AppState;
use super::traces::parse_status;
use crate::api::extractors::{SpanPath, TracePath, ValidatedQuery};
use crate::api::types::{ApiError, lenient_pagination, non_empty, parse_number_param};
use crate::data::types::{SpanRow, SpanSearchFilter, SpanType};

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SearchSpansQuery {
    #[validate(length(max = 256, message = "traceId must be at most 256 characters"))]
    pub trace_id: Option<String>,
    #[serde(rename = "type")]
    pub span_type: Option<String>,
    pub status: Option<String>,
    #[validate(length(max = 256, message = "name must be at most 256 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 256, message = "model must be at most 256 characters"))]
    pub model: Option<String>,
    pub min_duration: Option<String>,
    pub max_duration: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl SearchSpansQuery {
    fn to_filter(&self) -> Result<SpanSearchFilter, ApiError> {
        let span_type = match self.span_type.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(SpanType::parse(raw).ok_or_else(|| {
                ApiError::bad_request(
                    "INVALID_SPAN_TYPE",
                    format!("Invalid type: {}. Use SPAN, GENERATION or EVENT.", raw),
                )
            })?),
        };

        Ok(SpanSearchFilter {
            trace_id: non_empty(self.trace_id.clone()),
            span_type,
            status: parse_status(self.status.as_deref())?,
            name_contains: non_empty(self.name.clone()),
            model: non_empty(self.model.clone()),
            min_duration: parse_number_param("minDuration", self.min_duration.as_deref())?,
            max_duration: parse_number_param("maxDuration", self.max_duration.as_deref())?,
        })
    }
}

/// Spans of one trace in start-time order
pub async fn list_trace_spans(
    State(state): State<AppState>,
    path: TracePath,
) -> Result<Json<Vec<SpanRow>>, ApiError> {
    let spans = state
        .repo
        .list_spans(&path.trace_id)
        .await
        .map_err(ApiError::from_data)?;
    Ok(Json(spans))
}

pub async fn get_span(
    State(state): State<AppState>,
    path: SpanPath,
) -> Result<Json<SpanRow>, ApiError> {
    let span = state
        .repo
        .get_span(&path.trace_id, &path.span_id)
        .await
        .map_err(ApiError::from_data)?;

    span.map(Json).ok_or_else(|| {
        ApiError::not_found(
            "SPAN_NOT_FOUND",
            format!("Span not found: {}/{}", path.trace_id, path.span_id),
        )
    })
}

/// Free-form span search across all traces
pub async fn search_spans(
    State(state): State<AppState>,
    ValidatedQuery(query): ValidatedQuery<SearchSpansQuery>,
) -> Result<Json<Vec<SpanRow>>, ApiError> {
    let filter = query.to_filter()?;
    let pagination = lenient_pagination(query.limit.as_deref(), query.offset.as_deref());
    let spans = state
        .repo
        .search_spans(&filter, &pagination)
        .await
        .map_err(ApiError::from_data)?;
    Ok(Json(spans))
}
