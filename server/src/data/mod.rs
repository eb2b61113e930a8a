//! Data storage layer
//!
//! - `duckdb` - span store backend (single writer, cloned reader connections)
//! - `types` - ingestion records, stored rows and query results
//! - `traits` - repository trait consumed by the domain and API layers
//! - `error` - unified data-layer error

pub mod duckdb;
pub mod error;
pub mod traits;
pub mod types;

pub use duckdb::DuckdbService;
pub use error::DataError;
pub use traits::SpanRepository;
