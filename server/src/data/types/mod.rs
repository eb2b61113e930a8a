//! Shared data types for ingestion and queries

mod analytics;
mod enums;
mod normalized;

pub use enums::{SpanType, StatusCode};

pub use normalized::{NormalizedSpan, SpanRecord};

pub use analytics::{
    DatasetRunRow, GraphData, GraphEdge, GraphNode, GraphSpanRow, Pagination, RequestRow,
    SessionRow, SpanData, SpanRow, SpanSearchFilter, TraceDetail, TraceFilter, TraceQuery,
    TraceRow,
};
