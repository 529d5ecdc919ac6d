//! Database migrations for sace-queue.
//!
//! Each migration upgrades the schema by one version and runs automatically
//! when the database is opened.

use rusqlite::Connection;

use crate::error::QueueError;

/// Current schema version.
const CURRENT_VERSION: i32 = 1;

/// Get the current schema version from the database.
///
/// Returns 0 if no version has been set (new database).
pub fn get_version(conn: &Connection) -> Result<i32, QueueError> {
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))
        .map_err(|e| QueueError::Storage(format!("Failed to get schema version: {e}")))
}

fn set_version(conn: &Connection, version: i32) -> Result<(), QueueError> {
    conn.execute_batch(&format!("PRAGMA user_version = {version};"))
        .map_err(|e| QueueError::Storage(format!("Failed to set schema version: {e}")))
}

/// Run all pending migrations.
pub fn run(conn: &Connection) -> Result<(), QueueError> {
    let current = get_version(conn)?;

    if current >= CURRENT_VERSION {
        return Ok(());
    }

    for version in (current + 1)..=CURRENT_VERSION {
        tracing::debug!(version, "running schema migration");
        run_migration(conn, version)?;
        set_version(conn, version)?;
    }

    Ok(())
}

fn run_migration(conn: &Connection, version: i32) -> Result<(), QueueError> {
    match version {
        1 => migrate_v1(conn),
        _ => Err(QueueError::Storage(format!(
            "Unknown migration version: {version}"
        ))),
    }
}

/// Migration v1: string key-value table.
fn migrate_v1(conn: &Connection) -> Result<(), QueueError> {
    conn.execute_batch(
        r"
        CREATE TABLE IF NOT EXISTS kv_store (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        ",
    )
    .map_err(|e| QueueError::Storage(format!("Migration v1 failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_v1() {
        let conn = Connection::open_in_memory().unwrap();

        run(&conn).unwrap();
        assert_eq!(get_version(&conn).unwrap(), CURRENT_VERSION);

        conn.execute(
            "INSERT INTO kv_store (key, value, updated_at)
             VALUES ('@offline_queue', '[]', '2024-01-01T10:00:00Z')",
            [],
        )
        .unwrap();
    }

    #[test]
    fn test_migration_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        run(&conn).unwrap();
        run(&conn).unwrap();

        assert_eq!(get_version(&conn).unwrap(), CURRENT_VERSION);
    }

    #[test]
    fn test_get_version_new_database() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(get_version(&conn).unwrap(), 0);
    }
}
