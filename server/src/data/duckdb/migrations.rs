//! Database schema initialization and migrations
//!
//! Handles schema version tracking and incremental migrations.

use duckdb::Connection;

use super::error::DuckdbError;
use super::in_transaction;
use super::schema::{SCHEMA, SCHEMA_VERSION};

/// Initialize database schema or run pending migrations
pub fn run_migrations(conn: &Connection) -> Result<(), DuckdbError> {
    let table_exists: bool = conn
        .query_row(
            "SELECT COUNT(*) > 0 FROM information_schema.tables WHERE table_name = 'schema_version'",
            [],
            |row| row.get(0),
        )
        .unwrap_or(false);

    if !table_exists {
        tracing::debug!(version = SCHEMA_VERSION, "Initializing span store schema");
        return apply_initial_schema(conn);
    }

    let current_version: i32 = conn
        .query_row(
            "SELECT version FROM schema_version WHERE id = 1",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    if current_version > SCHEMA_VERSION {
        return Err(DuckdbError::MigrationFailed {
            version: current_version,
            name: "version_check".to_string(),
            error: format!(
                "Database schema version {} is newer than application version {}. Upgrade the application.",
                current_version, SCHEMA_VERSION
            ),
        });
    }

    if current_version == SCHEMA_VERSION {
        tracing::debug!(version = current_version, "Schema is up to date");
        return Ok(());
    }

    for version in (current_version + 1)..=SCHEMA_VERSION {
        tracing::debug!(version, "Applying migration");
        apply_migration(conn, version)?;
    }

    Ok(())
}

fn apply_initial_schema(conn: &Connection) -> Result<(), DuckdbError> {
    let start = std::time::Instant::now();

    in_transaction(conn, |conn| {
        conn.execute_batch(SCHEMA)?;

        let now = chrono::Utc::now().timestamp_nanos_opt().unwrap_or(0);
        conn.execute(
            "INSERT INTO schema_version (id, version, applied_at, description) VALUES (1, ?, ?, 'Initial schema')",
            duckdb::params![SCHEMA_VERSION, now],
        )?;

        tracing::debug!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Applied initial schema"
        );
        Ok(())
    })
}

fn apply_migration(conn: &Connection, version: i32) -> Result<(), DuckdbError> {
    match version {
        // Version 1 has no upgrade path; a stale row is repaired by re-applying
        // the idempotent schema.
        1 => in_transaction(conn, |conn| {
            conn.execute_batch(SCHEMA)
                .map_err(|e| DuckdbError::MigrationFailed {
                    version,
                    name: "initial_schema".to_string(),
                    error: e.to_string(),
                })?;
            let now = chrono::Utc::now().timestamp_nanos_opt().unwrap_or(0);
            conn.execute(
                "UPDATE schema_version SET version = ?, applied_at = ? WHERE id = 1",
                duckdb::params![version, now],
            )?;
            Ok(())
        }),
        _ => Err(DuckdbError::MigrationFailed {
            version,
            name: "unknown".to_string(),
            error: format!("Unknown migration version: {}", version),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_db() -> Connection {
        Connection::open_in_memory().expect("Failed to create in-memory database")
    }

    fn read_version(conn: &Connection) -> i32 {
        conn.query_row(
            "SELECT version FROM schema_version WHERE id = 1",
            [],
            |row| row.get(0),
        )
        .expect("Should be able to read schema version")
    }

    #[test]
    fn test_run_migrations_fresh_database() {
        let conn = create_test_db();
        run_migrations(&conn).expect("Migrations should succeed on fresh database");
        assert_eq!(read_version(&conn), SCHEMA_VERSION);

        let spans_exists: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM information_schema.tables WHERE table_name = 'spans'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert!(spans_exists);
    }

    #[test]
    fn test_run_migrations_idempotent() {
        let conn = create_test_db();
        run_migrations(&conn).expect("First migration should succeed");
        let result = run_migrations(&conn);
        assert!(result.is_ok(), "Running migrations twice should succeed");
    }

    #[test]
    fn test_newer_database_rejected() {
        let conn = create_test_db();
        run_migrations(&conn).unwrap();
        conn.execute(
            "UPDATE schema_version SET version = ? WHERE id = 1",
            duckdb::params![SCHEMA_VERSION + 5],
        )
        .unwrap();

        match run_migrations(&conn) {
            Err(DuckdbError::MigrationFailed { version, name, .. }) => {
                assert_eq!(version, SCHEMA_VERSION + 5);
                assert_eq!(name, "version_check");
            }
            other => panic!("Expected MigrationFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_stale_version_is_upgraded() {
        let conn = create_test_db();
        run_migrations(&conn).unwrap();
        conn.execute("UPDATE schema_version SET version = 0 WHERE id = 1", [])
            .unwrap();

        run_migrations(&conn).expect("Upgrade should succeed");
        assert_eq!(read_version(&conn), SCHEMA_VERSION);
    }

    #[test]
    fn test_apply_migration_unknown_version() {
        let conn = create_test_db();
        run_migrations(&conn).expect("Initial migrations should succeed");

        match apply_migration(&conn, 999) {
            Err(DuckdbError::MigrationFailed { version, .. }) => assert_eq!(version, 999),
            other => panic!("Expected MigrationFailed error, got {:?}", other),
        }
    }
}
