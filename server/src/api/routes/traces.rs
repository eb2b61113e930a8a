//! Trace API endpoints

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use validator::Validate;

use super::AppState;
use crate::api::extractors::{TracePath, ValidatedQuery};
use crate::api::types::{ApiError, lenient_pagination, non_empty, parse_number_param};
use crate::data::types::{
    GraphData, SpanRecord, StatusCode, TraceDetail, TraceFilter, TraceQuery, TraceRow,
};
use crate::domain::traces::load_graph;

/// Filters shared by every trace listing (global, per session, per dataset run)
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TraceListQuery {
    pub status: Option<String>,
    #[validate(length(max = 256, message = "name must be at most 256 characters"))]
    pub name: Option<String>,
    pub latency_gt: Option<String>,
    pub latency_lt: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl TraceListQuery {
    pub fn to_trace_query(&self) -> Result<TraceQuery, ApiError> {
        Ok(TraceQuery {
            filter: TraceFilter {
                status: parse_status(self.status.as_deref())?,
                name_contains: non_empty(self.name.clone()),
                latency_gt: parse_number_param("latencyGt", self.latency_gt.as_deref())?,
                latency_lt: parse_number_param("latencyLt", self.latency_lt.as_deref())?,
            },
            session_id: None,
            dataset_run_id: None,
            pagination: lenient_pagination(self.limit.as_deref(), self.offset.as_deref()),
        })
    }
}

/// Status filter: "0"/"1"/"2" or UNSET/OK/ERROR
pub(super) fn parse_status(value: Option<&str>) -> Result<Option<StatusCode>, ApiError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => StatusCode::parse(raw).map(Some).ok_or_else(|| {
            ApiError::bad_request(
                "INVALID_STATUS",
                format!("Invalid status: {}. Use 0, 1 or 2.", raw),
            )
        }),
    }
}

/// List derived traces, newest first
pub async fn list_traces(
    State(state): State<AppState>,
    ValidatedQuery(query): ValidatedQuery<TraceListQuery>,
) -> Result<Json<Vec<TraceRow>>, ApiError> {
    let query = query.to_trace_query()?;
    let rows = state
        .repo
        .list_traces(&query)
        .await
        .map_err(ApiError::from_data)?;
    Ok(Json(rows))
}

/// Get a single trace with all of its spans
pub async fn get_trace(
    State(state): State<AppState>,
    path: TracePath,
) -> Result<Json<TraceDetail>, ApiError> {
    let trace = state
        .repo
        .get_trace(&path.trace_id)
        .await
        .map_err(ApiError::from_data)?;

    trace.map(Json).ok_or_else(|| {
        ApiError::not_found(
            "TRACE_NOT_FOUND",
            format!("Trace not found: {}", path.trace_id),
        )
    })
}

/// Execution graph of one trace. Unknown traces yield an empty graph.
pub async fn get_trace_graph(
    State(state): State<AppState>,
    path: TracePath,
) -> Result<Json<GraphData>, ApiError> {
    let graph = load_graph(state.repo.as_ref(), &path.trace_id)
        .await
        .map_err(ApiError::from_data)?;
    Ok(Json(graph))
}

#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    #[serde(default)]
    pub spans: Vec<JsonValue>,
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub accepted: usize,
    pub skipped: usize,
}

/// Ingest a batch of span records.
///
/// Entries that are not span objects are counted as skipped; the rest are
/// stored in one transaction.
pub async fn ingest_traces(
    State(state): State<AppState>,
    Json(body): Json<IngestRequest>,
) -> Result<Json<IngestResponse>, ApiError> {
    let total = body.spans.len();
    let records: Vec<SpanRecord> = body
        .spans
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<SpanRecord>(value) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::debug!(error = %e, "Skipping unparseable span record");
                None
            }
        })
        .collect();
    let unparsed = total - records.len();

    let summary = state
        .ingestor
        .ingest(records)
        .await
        .map_err(ApiError::from_ingest)?;

    Ok(Json(IngestResponse {
        accepted: summary.accepted,
        skipped: summary.skipped + unparsed,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_list_query_conversion() {
        let query = TraceListQuery {
            status: Some("ERROR".to_string()),
            name: Some("agent".to_string()),
            latency_gt: Some("10".to_string()),
            limit: Some("5".to_string()),
            offset: Some("bogus".to_string()),
            ..Default::default()
        };
        let converted = query.to_trace_query().unwrap();

        assert_eq!(converted.filter.status, Some(StatusCode::Error));
        assert_eq!(converted.filter.name_contains.as_deref(), Some("agent"));
        assert_eq!(converted.filter.latency_gt, Some(10.0));
        assert_eq!(converted.filter.latency_lt, None);
        assert_eq!(converted.pagination.limit, Some(5));
        assert_eq!(converted.pagination.offset, None);
    }

    #[test]
    fn test_invalid_status_rejected() {
        assert!(parse_status(Some("3")).is_err());
        assert_eq!(parse_status(Some("")).unwrap(), None);
        assert_eq!(parse_status(Some("1")).unwrap(), Some(StatusCode::Ok));
    }

    #[test]
    fn test_name_length_validated() {
        let query = TraceListQuery {
            name: Some("x".repeat(300)),
            ..Default::default()
        };
        assert!(query.validate().is_err());
    }
}
