//! Durable string key-value store.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use super::Database;
use crate::error::QueueError;

/// Async get/set/remove over string keys, persisted across restarts.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>, QueueError>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> Result<(), QueueError>;

    /// Remove `key`. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), QueueError>;
}

/// Key-value store backed by the `kv_store` table.
///
/// Queries run on tokio's blocking pool.
pub struct SqliteStore {
    db: Arc<Mutex<Database>>,
}

impl SqliteStore {
    /// Wrap an opened database.
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
        }
    }

    async fn with_db<T, F>(&self, f: F) -> Result<T, QueueError>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> Result<T, QueueError> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
            let db = db.lock().unwrap_or_else(PoisonError::into_inner);
            f(&db)
        })
        .await
        .map_err(|e| QueueError::Storage(format!("Storage task failed: {e}")))?
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>, QueueError> {
        let key = key.to_string();

        self.with_db(move |db| {
            db.connection()
                .query_row("SELECT value FROM kv_store WHERE key = ?1", [&key], |row| {
                    row.get(0)
                })
                .optional()
                .map_err(|e| QueueError::Storage(format!("Failed to read key {key}: {e}")))
        })
        .await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), QueueError> {
        let key = key.to_string();
        let value = value.to_string();

        self.with_db(move |db| {
            db.connection()
                .execute(
                    r"INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
                      ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                                                     updated_at = excluded.updated_at",
                    params![key, value, Utc::now().to_rfc3339()],
                )
                .map_err(|e| QueueError::Storage(format!("Failed to write key {key}: {e}")))?;
            Ok(())
        })
        .await
    }

    async fn remove(&self, key: &str) -> Result<(), QueueError> {
        let key = key.to_string();

        self.with_db(move |db| {
            db.connection()
                .execute("DELETE FROM kv_store WHERE key = ?1", [&key])
                .map_err(|e| QueueError::Storage(format!("Failed to remove key {key}: {e}")))?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_store() -> SqliteStore {
        SqliteStore::new(Database::open_in_memory().unwrap())
    }

    #[tokio::test]
    async fn test_get_missing_key() {
        let store = memory_store();
        assert_eq!(store.get("@offline_queue").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_overwrites() {
        let store = memory_store();

        store.set("k", "first").await.unwrap();
        store.set("k", "second").await.unwrap();

        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn test_remove() {
        let store = memory_store();

        store.set("k", "v").await.unwrap();
        store.remove("k").await.unwrap();
        store.remove("k").await.unwrap();

        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_value_survives_reopen() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let db_path = temp_dir.path().join("queue.db");

        {
            let store = SqliteStore::new(Database::open_at(&db_path).unwrap());
            store.set("@offline_queue", "[]").await.unwrap();
        }

        let store = SqliteStore::new(Database::open_at(&db_path).unwrap());
        assert_eq!(
            store.get("@offline_queue").await.unwrap().as_deref(),
            Some("[]")
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_writers_share_connection() {
        let store = Arc::new(memory_store());

        let handles: Vec<_> = (0..8)
            .map(|n| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.set(&format!("k{n}"), "v").await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        for n in 0..8 {
            assert!(store.get(&format!("k{n}")).await.unwrap().is_some());
        }
    }
}
