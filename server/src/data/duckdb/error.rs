//! DuckDB backend error type

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DuckdbError {
    #[error("DuckDB error: {0}")]
    Database(#[from] duckdb::Error),

    #[error("Migration {version} ({name}) failed: {error}")]
    MigrationFailed {
        version: i32,
        name: String,
        error: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("DuckDB connection is closed")]
    Closed,
}
