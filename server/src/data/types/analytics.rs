//! Query parameters and result rows for the span store
//!
//! All result types serialize as camelCase JSON.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;

use super::enums::{SpanType, StatusCode};

// ============================================================================
// Query parameters
// ============================================================================

/// DuckDB rejects `LIMIT`/`OFFSET` values of 2^62 and above
const MAX_SQL_LIMIT: u64 = (1 << 62) - 1;

/// Limit/offset pair. `None` means "not applied".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pagination {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl Pagination {
    pub fn new(limit: Option<u64>, offset: Option<u64>) -> Self {
        Self { limit, offset }
    }

    /// `LIMIT`/`OFFSET` suffix. Values are typed integers and rendered inline,
    /// capped at the largest value DuckDB accepts for either clause.
    pub fn to_sql(&self) -> String {
        let cap = |v: u64| v.min(MAX_SQL_LIMIT);
        match (self.limit.map(cap), self.offset.map(cap)) {
            (Some(l), Some(o)) => format!(" LIMIT {} OFFSET {}", l, o),
            (Some(l), None) => format!(" LIMIT {}", l),
            (None, Some(o)) => format!(" OFFSET {}", o),
            (None, None) => String::new(),
        }
    }
}

/// Filters applied to derived trace rows. All present filters are AND-combined.
#[derive(Debug, Clone, Default)]
pub struct TraceFilter {
    pub status: Option<StatusCode>,
    pub name_contains: Option<String>,
    pub latency_gt: Option<f64>,
    pub latency_lt: Option<f64>,
}

/// Shared input for every trace-shaped listing
#[derive(Debug, Clone, Default)]
pub struct TraceQuery {
    pub filter: TraceFilter,
    pub session_id: Option<String>,
    pub dataset_run_id: Option<String>,
    pub pagination: Pagination,
}

/// Free-form span search filter
#[derive(Debug, Clone, Default)]
pub struct SpanSearchFilter {
    pub trace_id: Option<String>,
    pub span_type: Option<SpanType>,
    pub status: Option<StatusCode>,
    pub name_contains: Option<String>,
    pub model: Option<String>,
    pub min_duration: Option<i64>,
    pub max_duration: Option<i64>,
}

// ============================================================================
// Result rows
// ============================================================================

/// Derived trace summary
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceRow {
    pub id: String,
    pub name: String,
    pub status: StatusCode,
    /// Maximum span duration in the trace, milliseconds
    pub latency: i64,
    pub cost: f64,
    pub tokens: i64,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub span_count: i64,
}

/// Root metadata plus ordered spans for one trace
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceDetail {
    #[serde(flatten)]
    pub trace: TraceRow,
    pub spans: Vec<SpanRow>,
}

/// Typed, de-serialized view over a stored span's LLM/session/cost fields
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpanData {
    pub model: Option<String>,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub total_tokens: i64,
    pub reasoning_tokens: i64,
    pub cost: f64,
    pub input: JsonValue,
    pub output: Option<String>,
    pub output_object: JsonValue,
    pub tool_calls: JsonValue,
    pub finish_reason: Option<String>,
    pub settings: JsonValue,
    pub session_id: Option<String>,
    pub session_name: Option<String>,
    pub user_id: Option<String>,
    pub trace_name: Option<String>,
    pub prompt_name: Option<String>,
    pub props: JsonValue,
    pub dataset_run_id: Option<String>,
    pub dataset_run_name: Option<String>,
    pub dataset_path: Option<String>,
    pub dataset_item_name: Option<String>,
    pub dataset_expected_output: JsonValue,
    pub metadata: JsonValue,
}

/// One stored span as returned by span listings
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpanRow {
    pub id: String,
    pub trace_id: String,
    pub parent_id: Option<String>,
    pub name: String,
    #[serde(rename = "type")]
    pub span_type: SpanType,
    pub status: StatusCode,
    pub status_message: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration: i64,
    pub data: SpanData,
    pub attributes: JsonValue,
    pub events: JsonValue,
    pub links: JsonValue,
}

/// One GENERATION span as returned by `list_requests`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestRow {
    pub id: String,
    pub trace_id: String,
    pub span_name: String,
    pub model: Option<String>,
    pub prompt_name: Option<String>,
    pub user_id: Option<String>,
    pub status: StatusCode,
    pub input: Option<String>,
    /// Plain text output, else structured output, else tool calls
    pub output: Option<String>,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub total_tokens: i64,
    pub reasoning_tokens: i64,
    pub cost: f64,
    pub timestamp: DateTime<Utc>,
    pub latency: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRow {
    pub id: String,
    pub name: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub trace_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetRunRow {
    pub id: String,
    pub name: Option<String>,
    pub trace_count: i64,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

// ============================================================================
// Execution graph
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub id: String,
    pub node_type: Option<String>,
    pub display_name: Option<String>,
    pub span_id: String,
    pub span_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GraphData {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

/// Minimal span projection consumed by the graph reconstructor
#[derive(Debug, Clone, PartialEq)]
pub struct GraphSpanRow {
    pub span_id: String,
    pub span_name: String,
    pub metadata: Option<String>,
}
