//! Trace domain logic
//!
//! - `normalize` - span record → stored row, with cost attribution
//! - `graph` - execution graph reconstruction from span metadata
//! - `pipeline` - ingestion orchestrator (pricing snapshot, normalize, export)

pub mod graph;
pub mod normalize;
mod pipeline;

pub use graph::{build_graph, load_graph};
pub use normalize::{NormalizedBatch, normalize_batch, normalize_span};
pub use pipeline::{IngestError, IngestSummary, TraceIngestor};
