//! DuckDB span store backend
//!
//! One writer connection serialized by a mutex, plus a root connection that
//! hands out a fresh cloned connection to every read. Readers therefore never
//! wait on an in-flight ingestion batch and only observe committed data.

pub mod error;
mod migrations;
pub mod repositories;
mod repository_impl;
pub mod schema;

pub use error::DuckdbError;
pub use repositories::query as query_repository;
pub use repositories::span as span_repository;

use std::path::Path;
use std::sync::Arc;

use duckdb::Connection;
use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};

use crate::core::constants::DUCKDB_DB_FILENAME;
use crate::core::storage::{AppStorage, DataSubdir};

pub struct DuckdbService {
    writer: Mutex<Option<Connection>>,
    readers: Mutex<Option<Connection>>,
}

impl Drop for DuckdbService {
    fn drop(&mut self) {
        for slot in [self.readers.get_mut(), self.writer.get_mut()] {
            if let Some(conn) = slot.take()
                && let Err((_, e)) = conn.close()
            {
                tracing::warn!("DuckDB connection close failed during drop: {}", e);
            }
        }
    }
}

impl DuckdbService {
    /// Open (or create) the on-disk database under the storage `duckdb/` directory
    pub async fn init(storage: &AppStorage) -> Result<Self, DuckdbError> {
        let db_path = storage.subdir(DataSubdir::Duckdb).join(DUCKDB_DB_FILENAME);
        let service = tokio::task::spawn_blocking(move || Self::open_path(&db_path))
            .await
            .map_err(|e| DuckdbError::Io(std::io::Error::other(e)))??;

        tracing::debug!(
            path = %storage.subdir(DataSubdir::Duckdb).join(DUCKDB_DB_FILENAME).display(),
            "DuckdbService initialized"
        );
        Ok(service)
    }

    /// In-memory database, used by tests and embedders that need no persistence
    pub fn open_in_memory() -> Result<Self, DuckdbError> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn open_path(path: &Path) -> Result<Self, DuckdbError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "SET autoinstall_known_extensions = false;
             SET autoload_known_extensions = false;
             PRAGMA enable_checkpoint_on_shutdown;",
        )?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, DuckdbError> {
        migrations::run_migrations(&conn)?;
        let readers = conn.try_clone()?;
        Ok(Self {
            writer: Mutex::new(Some(conn)),
            readers: Mutex::new(Some(readers)),
        })
    }

    /// Exclusive access to the writer connection
    pub fn writer(&self) -> Result<MappedMutexGuard<'_, Connection>, DuckdbError> {
        MutexGuard::try_map(self.writer.lock(), |opt| opt.as_mut()).map_err(|_| DuckdbError::Closed)
    }

    /// A new connection to the same database for one read
    pub fn reader(&self) -> Result<Connection, DuckdbError> {
        let guard = self.readers.lock();
        let root = guard.as_ref().ok_or(DuckdbError::Closed)?;
        Ok(root.try_clone()?)
    }

    /// Run a blocking DuckDB closure on the blocking thread pool
    pub async fn run_query<T, F>(f: F) -> Result<T, DuckdbError>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        tokio::task::spawn_blocking(f).await.map_err(|e| {
            tracing::error!(error = %e, "DuckDB query task failed");
            DuckdbError::Io(std::io::Error::other(format!(
                "Query execution failed: {}",
                e
            )))
        })
    }

    /// Flush the WAL to the main database file. No-op once closed.
    pub async fn checkpoint(self: &Arc<Self>) -> Result<(), DuckdbError> {
        let db = Arc::clone(self);
        tokio::task::spawn_blocking(move || {
            let guard = db.writer.lock();
            if let Some(ref conn) = *guard {
                conn.execute("CHECKPOINT", [])?;
                tracing::debug!("DuckDB checkpoint completed");
            }
            Ok(())
        })
        .await
        .map_err(|e| DuckdbError::Io(std::io::Error::other(e)))?
    }

    /// Checkpoint and close both connections
    pub async fn close(self: Arc<Self>) -> Result<(), DuckdbError> {
        tokio::task::spawn_blocking(move || {
            if let Some(conn) = self.readers.lock().take() {
                conn.close().map_err(|(_, e)| DuckdbError::Database(e))?;
            }
            let mut guard = self.writer.lock();
            if let Some(conn) = guard.take() {
                if let Err(e) = conn.execute("CHECKPOINT", []) {
                    tracing::warn!("CHECKPOINT failed during close: {}", e);
                }
                conn.close().map_err(|(_, e)| DuckdbError::Database(e))?;
                tracing::debug!("DuckDB connection closed");
            }
            Ok(())
        })
        .await
        .map_err(|e| DuckdbError::Io(std::io::Error::other(e)))?
    }
}

/// Execute a function within a transaction, automatically rolling back on error.
pub(crate) fn in_transaction<F, T>(conn: &Connection, f: F) -> Result<T, DuckdbError>
where
    F: FnOnce(&Connection) -> Result<T, DuckdbError>,
{
    conn.execute_batch("BEGIN TRANSACTION")?;
    match f(conn) {
        Ok(val) => {
            conn.execute_batch("COMMIT")?;
            Ok(val)
        }
        Err(e) => {
            if let Err(rollback_err) = conn.execute_batch("ROLLBACK") {
                tracing::warn!("ROLLBACK failed after transaction error: {}", rollback_err);
            }
            Err(e)
        }
    }
}
