//! `SQLite` database connection.
//!
//! The database is stored at `~/.sace-queue/queue.db` and holds a single
//! `kv_store` table backing [`super::SqliteStore`].

use rusqlite::Connection;

use crate::config::Paths;
use crate::error::QueueError;

use super::migrations;

/// Database connection wrapper.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database under the given data paths.
    ///
    /// Creates the data directory, the database file and runs migrations if
    /// necessary.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrations fail.
    pub fn open(paths: &Paths) -> Result<Self, QueueError> {
        paths.ensure_dirs()?;
        Self::open_at(&paths.database)
    }

    /// Open the database at a specific path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrations fail.
    pub fn open_at(path: &std::path::Path) -> Result<Self, QueueError> {
        let conn = Connection::open(path).map_err(|e| {
            QueueError::Storage(format!("Failed to open database {}: {e}", path.display()))
        })?;

        conn.busy_timeout(std::time::Duration::from_secs(5))
            .map_err(|e| QueueError::Storage(format!("Failed to set busy timeout: {e}")))?;

        let db = Self { conn };
        db.migrate()?;

        tracing::debug!(path = %path.display(), "opened queue database");
        Ok(db)
    }

    /// Open an in-memory database (useful for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrations fail.
    pub fn open_in_memory() -> Result<Self, QueueError> {
        let conn = Connection::open_in_memory().map_err(|e| {
            QueueError::Storage(format!("Failed to open in-memory database: {e}"))
        })?;

        let db = Self { conn };
        db.migrate()?;

        Ok(db)
    }

    fn migrate(&self) -> Result<(), QueueError> {
        migrations::run(&self.conn)
    }

    /// Get the current schema version.
    ///
    /// # Errors
    ///
    /// Returns an error if the version cannot be read.
    pub fn schema_version(&self) -> Result<i32, QueueError> {
        migrations::get_version(&self.conn)
    }

    /// Get a reference to the underlying connection.
    #[must_use]
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.schema_version().unwrap() > 0);
    }

    #[test]
    fn test_open_creates_data_dir() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let paths = Paths::with_root(temp_dir.path().join("nested"));

        let db = Database::open(&paths).unwrap();
        assert!(db.schema_version().unwrap() > 0);
        assert!(paths.database.exists());
    }

    #[test]
    fn test_reopen_database() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let db_path = temp_dir.path().join("queue.db");

        {
            let db = Database::open_at(&db_path).unwrap();
            assert!(db.schema_version().unwrap() > 0);
        }

        // Reopen - should not run migrations again
        {
            let db = Database::open_at(&db_path).unwrap();
            assert!(db.schema_version().unwrap() > 0);
        }
    }
}
