//! API route handlers

pub mod dataset_runs;
pub mod health;
pub mod requests;
pub mod sessions;
pub mod spans;
pub mod traces;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;

use crate::data::SpanRepository;
use crate::domain::traces::TraceIngestor;

/// Shared state for the span store API
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn SpanRepository>,
    pub ingestor: Arc<TraceIngestor>,
}

/// Build `/api/v1` routes
pub fn routes(state: AppState) -> Router<()> {
    Router::new()
        // Traces
        .route(
            "/traces",
            get(traces::list_traces).post(traces::ingest_traces),
        )
        .route("/traces/{trace_id}", get(traces::get_trace))
        .route("/traces/{trace_id}/graph", get(traces::get_trace_graph))
        // Spans (nested under traces)
        .route("/traces/{trace_id}/spans", get(spans::list_trace_spans))
        .route("/traces/{trace_id}/spans/{span_id}", get(spans::get_span))
        // Spans (top-level search)
        .route("/spans", get(spans::search_spans))
        // Requests
        .route("/requests", get(requests::list_requests))
        // Sessions
        .route("/sessions", get(sessions::list_sessions))
        .route(
            "/sessions/{session_id}/traces",
            get(sessions::list_session_traces),
        )
        // Dataset runs
        .route("/dataset-runs", get(dataset_runs::list_dataset_runs))
        .route(
            "/dataset-runs/{run_id}/traces",
            get(dataset_runs::list_dataset_run_traces),
        )
        .with_state(state)
}
