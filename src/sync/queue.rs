//! Persisted queue storage.
//!
//! The whole queue lives as one JSON array under [`QUEUE_KEY`]. Every
//! mutation reads the array, modifies it and writes it back. Mutations edit
//! the stored JSON entries directly, so fields and entries this version
//! cannot parse survive unchanged.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::operation::{entry_id, QueueStatus, QueuedOperation};
use crate::error::QueueError;
use crate::storage::KeyValueStore;

/// Storage key of the persisted queue.
pub const QUEUE_KEY: &str = "@offline_queue";

/// Queue of offline operations persisted in a [`KeyValueStore`].
pub struct QueueStore {
    kv: Arc<dyn KeyValueStore>,
    // Serializes load-modify-save cycles
    lock: Mutex<()>,
}

impl QueueStore {
    /// Create a queue store on top of a key-value store.
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kv,
            lock: Mutex::new(()),
        }
    }

    /// Load the queue in replay order.
    ///
    /// A missing or unparseable value yields an empty queue. Entries without
    /// a usable id are left out but stay stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store cannot be read.
    pub async fn load(&self) -> Result<Vec<QueuedOperation>, QueueError> {
        let _guard = self.lock.lock().await;
        Ok(typed(self.read().await?))
    }

    /// Replace the persisted queue.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue cannot be serialized or written.
    pub async fn save(&self, queue: &[QueuedOperation]) -> Result<(), QueueError> {
        let _guard = self.lock.lock().await;
        let entries = queue
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        self.write(&entries).await
    }

    /// Append an operation at the tail.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue cannot be read or written.
    pub async fn append(&self, operation: QueuedOperation) -> Result<(), QueueError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read().await?;
        debug!(id = %operation.id, position = entries.len(), "appending operation");
        entries.push(serde_json::to_value(&operation)?);
        self.write(&entries).await
    }

    /// Remove the operation with `id`.
    ///
    /// Returns whether an entry was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue cannot be read or written.
    pub async fn remove(&self, id: &str) -> Result<bool, QueueError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read().await?;
        let before = entries.len();
        entries.retain(|entry| entry_id(entry).as_deref() != Some(id));

        if entries.len() == before {
            debug!(id, "operation already gone");
            return Ok(false);
        }

        self.write(&entries).await?;
        Ok(true)
    }

    /// Set the retry count of the operation with `id`, keeping its position.
    ///
    /// Only the `retries` field of the stored entry changes.
    ///
    /// Returns whether the entry was found.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue cannot be read or written.
    pub async fn update_retries(&self, id: &str, retries: u32) -> Result<bool, QueueError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read().await?;

        let Some(entry) = entries
            .iter_mut()
            .filter(|entry| entry_id(entry).as_deref() == Some(id))
            .find_map(Value::as_object_mut)
        else {
            debug!(id, "operation already gone");
            return Ok(false);
        };
        entry.insert("retries".to_string(), Value::from(retries));

        self.write(&entries).await?;
        Ok(true)
    }

    /// Find an operation by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store cannot be read.
    pub async fn get(&self, id: &str) -> Result<Option<QueuedOperation>, QueueError> {
        Ok(self.load().await?.into_iter().find(|op| op.id == id))
    }

    /// Count and summarize the queued operations.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store cannot be read.
    pub async fn status(&self) -> Result<QueueStatus, QueueError> {
        Ok(QueueStatus::from_queue(&self.load().await?))
    }

    /// Drop the persisted queue.
    ///
    /// # Errors
    ///
    /// Returns an error if the key cannot be removed.
    pub async fn clear(&self) -> Result<(), QueueError> {
        let _guard = self.lock.lock().await;
        self.kv.remove(QUEUE_KEY).await
    }

    async fn read(&self) -> Result<Vec<Value>, QueueError> {
        Ok(self
            .kv
            .get(QUEUE_KEY)
            .await?
            .map(|raw| parse_entries(&raw))
            .unwrap_or_default())
    }

    async fn write(&self, entries: &[Value]) -> Result<(), QueueError> {
        let raw = serde_json::to_string(entries)?;
        self.kv.set(QUEUE_KEY, &raw).await
    }
}

fn parse_entries(raw: &str) -> Vec<Value> {
    match serde_json::from_str(raw) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(error = %e, "stored queue is not a JSON array, treating as empty");
            Vec::new()
        },
    }
}

fn typed(entries: Vec<Value>) -> Vec<QueuedOperation> {
    entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match serde_json::from_value(entry) {
            Ok(operation) => Some(operation),
            Err(e) => {
                warn!(index, error = %e, "skipping malformed queue entry");
                None
            },
        })
        .collect()
}
