use std::path::Path;

use rusqlite::Connection;

use super::DatabaseError;

/// Current schema version shipped with this build.
pub const SCHEMA_VERSION: i64 = 1;

/// Open a SQLite connection to the given path and apply the schema
pub fn open_database(path: &Path) -> Result<Connection, DatabaseError> {
    let conn = Connection::open(path)?;
    configure_pragmas(&conn)?;
    apply_schema(&conn)?;
    Ok(conn)
}

/// Open an in-memory database (for testing)
pub fn open_memory_database() -> Result<Connection, DatabaseError> {
    let conn = Connection::open_in_memory()?;
    configure_pragmas(&conn)?;
    apply_schema(&conn)?;
    Ok(conn)
}

fn configure_pragmas(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute_batch(
        "PRAGMA journal_mode=DELETE;
         PRAGMA foreign_keys=ON;"
    )?;
    Ok(())
}

/// Create the schema when the database is behind `SCHEMA_VERSION`.
pub fn apply_schema(conn: &Connection) -> Result<(), DatabaseError> {
    let current_version = get_current_version(conn)?;
    if current_version >= SCHEMA_VERSION {
        return Ok(());
    }

    tracing::info!(from = current_version, to = SCHEMA_VERSION, "Applying schema");
    conn.execute_batch(include_str!("../../resources/schema/001_initial.sql"))
        .map_err(|e| DatabaseError::SchemaFailed {
            version: SCHEMA_VERSION,
            reason: e.to_string(),
        })?;

    Ok(())
}

/// Get the current schema version (0 if no schema exists yet)
fn get_current_version(conn: &Connection) -> Result<i64, DatabaseError> {
    let has_table: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'schema_version')",
        [],
        |row| row.get(0),
    )?;
    if !has_table {
        return Ok(0);
    }
    let version: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(version.unwrap_or(0))
}

/// Count tables in the database (for verification)
pub fn count_tables(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |row| row.get::<_, i64>(0),
    )?;
    Ok(count)
}
