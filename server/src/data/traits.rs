//! Repository trait for the span store
//!
//! The store is the only persistence seam. Implemented for `Arc<DuckdbService>`.

use async_trait::async_trait;

use crate::data::error::DataError;
use crate::data::types::{
    DatasetRunRow, GraphSpanRow, NormalizedSpan, Pagination, RequestRow, SessionRow, SpanRow,
    SpanSearchFilter, TraceDetail, TraceQuery, TraceRow,
};

#[async_trait]
pub trait SpanRepository: Send + Sync {
    // ==================== Writes ====================

    /// Insert a batch of spans in one transaction (all-or-nothing)
    async fn export_traces(&self, spans: Vec<NormalizedSpan>) -> Result<(), DataError>;

    // ==================== Traces ====================

    /// Derived traces, newest first. Scoped by session or dataset run when set.
    async fn list_traces(&self, query: &TraceQuery) -> Result<Vec<TraceRow>, DataError>;

    async fn get_trace(&self, trace_id: &str) -> Result<Option<TraceDetail>, DataError>;

    // ==================== Spans ====================

    async fn list_spans(&self, trace_id: &str) -> Result<Vec<SpanRow>, DataError>;

    async fn get_span(&self, trace_id: &str, span_id: &str)
    -> Result<Option<SpanRow>, DataError>;

    async fn search_spans(
        &self,
        filter: &SpanSearchFilter,
        pagination: &Pagination,
    ) -> Result<Vec<SpanRow>, DataError>;

    async fn list_graph_spans(&self, trace_id: &str) -> Result<Vec<GraphSpanRow>, DataError>;

    // ==================== Requests, Sessions, Runs ====================

    async fn list_requests(&self, pagination: &Pagination) -> Result<Vec<RequestRow>, DataError>;

    async fn list_sessions(&self) -> Result<Vec<SessionRow>, DataError>;

    async fn list_dataset_runs(&self) -> Result<Vec<DatasetRunRow>, DataError>;
}
