//! Replay of queued operations against the register API.

use std::sync::Arc;

use async_trait::async_trait;

use super::operation::{Mutation, QueuedOperation, RegisterPayload};
use crate::error::QueueError;

/// Remote register endpoints.
///
/// Any error is an opaque rejection; the queue does not distinguish
/// transient from permanent failures.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RegisterApi: Send + Sync {
    /// Create a register.
    async fn create_register(&self, payload: &RegisterPayload) -> anyhow::Result<()>;

    /// Update the register with `registro_id`.
    async fn update_register(&self, registro_id: i64, payload: &RegisterPayload)
        -> anyhow::Result<()>;
}

/// Dispatches mutations to the [`RegisterApi`].
#[derive(Clone)]
pub struct OperationExecutor {
    api: Arc<dyn RegisterApi>,
}

impl OperationExecutor {
    /// Create an executor for the given API.
    #[must_use]
    pub fn new(api: Arc<dyn RegisterApi>) -> Self {
        Self { api }
    }

    /// Replay a queued operation.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Api`] if the API rejects the call, or
    /// [`QueueError::UnknownOperation`] if the entry has no known type.
    pub async fn execute(&self, operation: &QueuedOperation) -> Result<(), QueueError> {
        self.dispatch(&operation.mutation).await
    }

    /// Send a mutation to the API.
    ///
    /// # Errors
    ///
    /// Same as [`execute`](Self::execute).
    pub async fn dispatch(&self, mutation: &Mutation) -> Result<(), QueueError> {
        match mutation {
            Mutation::CreateRegister(payload) => self.api.create_register(payload).await?,
            Mutation::UpdateRegister {
                registro_id,
                payload,
            } => self.api.update_register(*registro_id, payload).await?,
            Mutation::Unrecognized { kind, reason, .. } => {
                return Err(QueueError::UnknownOperation {
                    kind: kind.clone(),
                    reason: reason.clone(),
                })
            },
        }
        Ok(())
    }
}
