//! Error types for sace-queue.

use thiserror::Error;

/// Errors produced by the offline queue and its collaborators.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The durable key-value store failed to read or write.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration could not be resolved, read, or parsed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON (de)serialization failed.
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Filesystem or socket error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A queued entry carries a type the executor cannot dispatch.
    #[error("Unknown operation type '{kind}': {reason}")]
    UnknownOperation {
        /// The `type` tag found on the entry.
        kind: String,
        /// Why the entry could not be mapped to a known mutation.
        reason: String,
    },

    /// The register API rejected a call.
    #[error("API call failed: {0}")]
    Api(#[from] anyhow::Error),

    /// A requested entry does not exist.
    #[error("Not found: {0}")]
    NotFound(String),
}

impl QueueError {
    /// Check if this error comes from the persistence layer.
    #[must_use]
    pub const fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}
