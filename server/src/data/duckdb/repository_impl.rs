//! SpanRepository implementation for DuckDB
//!
//! Implemented for `Arc<DuckdbService>` because connection guards are not
//! `Send`; each method clones the Arc and acquires its connection inside the
//! blocking closure. Writes go through the shared writer, reads use a fresh
//! cloned connection.

use std::sync::Arc;

use async_trait::async_trait;

use crate::data::error::DataError;
use crate::data::traits::SpanRepository;
use crate::data::types::{
    DatasetRunRow, GraphSpanRow, NormalizedSpan, Pagination, RequestRow, SessionRow, SpanRow,
    SpanSearchFilter, TraceDetail, TraceQuery, TraceRow,
};

use super::{DuckdbError, DuckdbService, in_transaction};
use super::repositories::{query, span};

#[async_trait]
impl SpanRepository for Arc<DuckdbService> {
    async fn export_traces(&self, spans: Vec<NormalizedSpan>) -> Result<(), DataError> {
        let db = Arc::clone(self);
        DuckdbService::run_query(move || {
            let conn = db.writer()?;
            span::insert_batch(&conn, &spans)
        })
        .await
        .map_err(DataError::from)?
        .map_err(Into::into)
    }

    async fn list_traces(&self, query: &TraceQuery) -> Result<Vec<TraceRow>, DataError> {
        let db = Arc::clone(self);
        let query = query.clone();
        DuckdbService::run_query(move || {
            let conn = db.reader()?;
            query::list_traces(&conn, &query)
        })
        .await
        .map_err(DataError::from)?
        .map_err(Into::into)
    }

    async fn get_trace(&self, trace_id: &str) -> Result<Option<TraceDetail>, DataError> {
        let db = Arc::clone(self);
        let tid = trace_id.to_string();
        DuckdbService::run_query(move || -> Result<Option<TraceDetail>, DuckdbError> {
            let conn = db.reader()?;
            // Trace row and spans must come from one snapshot
            in_transaction(&conn, |conn| {
                let Some(trace) = query::get_trace(conn, &tid)? else {
                    return Ok(None);
                };
                let spans = query::list_spans(conn, &tid)?;
                Ok(Some(TraceDetail { trace, spans }))
            })
        })
        .await
        .map_err(DataError::from)?
        .map_err(Into::into)
    }

    async fn list_spans(&self, trace_id: &str) -> Result<Vec<SpanRow>, DataError> {
        let db = Arc::clone(self);
        let tid = trace_id.to_string();
        DuckdbService::run_query(move || {
            let conn = db.reader()?;
            query::list_spans(&conn, &tid)
        })
        .await
        .map_err(DataError::from)?
        .map_err(Into::into)
    }

    async fn get_span(
        &self,
        trace_id: &str,
        span_id: &str,
    ) -> Result<Option<SpanRow>, DataError> {
        let db = Arc::clone(self);
        let tid = trace_id.to_string();
        let sid = span_id.to_string();
        DuckdbService::run_query(move || {
            let conn = db.reader()?;
            query::get_span(&conn, &tid, &sid)
        })
        .await
        .map_err(DataError::from)?
        .map_err(Into::into)
    }

    async fn search_spans(
        &self,
        filter: &SpanSearchFilter,
        pagination: &Pagination,
    ) -> Result<Vec<SpanRow>, DataError> {
        let db = Arc::clone(self);
        let filter = filter.clone();
        let pagination = *pagination;
        DuckdbService::run_query(move || {
            let conn = db.reader()?;
            query::search_spans(&conn, &filter, &pagination)
        })
        .await
        .map_err(DataError::from)?
        .map_err(Into::into)
    }

    async fn list_graph_spans(&self, trace_id: &str) -> Result<Vec<GraphSpanRow>, DataError> {
        let db = Arc::clone(self);
        let tid = trace_id.to_string();
        DuckdbService::run_query(move || {
            let conn = db.reader()?;
            query::list_graph_spans(&conn, &tid)
        })
        .await
        .map_err(DataError::from)?
        .map_err(Into::into)
    }

    async fn list_requests(&self, pagination: &Pagination) -> Result<Vec<RequestRow>, DataError> {
        let db = Arc::clone(self);
        let pagination = *pagination;
        DuckdbService::run_query(move || {
            let conn = db.reader()?;
            query::list_requests(&conn, &pagination)
        })
        .await
        .map_err(DataError::from)?
        .map_err(Into::into)
    }

    async fn list_sessions(&self) -> Result<Vec<SessionRow>, DataError> {
        let db = Arc::clone(self);
        DuckdbService::run_query(move || {
            let conn = db.reader()?;
            query::list_sessions(&conn)
        })
        .await
        .map_err(DataError::from)?
        .map_err(Into::into)
    }

    async fn list_dataset_runs(&self) -> Result<Vec<DatasetRunRow>, DataError> {
        let db = Arc::clone(self);
        DuckdbService::run_query(move || {
            let conn = db.reader()?;
            query::list_dataset_runs(&conn)
        })
        .await
        .map_err(DataError::from)?
        .map_err(Into::into)
    }
}
