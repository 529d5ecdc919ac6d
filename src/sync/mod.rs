//! Offline operation queue.
//!
//! Register mutations made while the device is offline are persisted under
//! a single storage key and replayed in FIFO order once connectivity
//! returns. Each entry gets a bounded number of replay attempts before it
//! is dropped.
//!
//! - [`QueueStore`]: load-modify-save of the persisted queue
//! - [`OperationExecutor`]: replays one entry against the [`RegisterApi`]
//! - [`QueueController`]: connectivity tracking, enqueue, single-flight drain

pub mod controller;
pub mod executor;
pub mod operation;
pub mod queue;
pub mod report;

pub use controller::{QueueController, Submission};
pub use executor::{OperationExecutor, RegisterApi};
pub use operation::{
    FileAttachment, Mutation, OperationSummary, OperationType, QueueStatus, QueuedOperation,
    RegisterPayload,
};
pub use queue::{QueueStore, QUEUE_KEY};
pub use report::{DrainOutcome, DrainReport};

/// Replay attempts an entry gets before it is dropped.
pub const MAX_RETRIES: u32 = 3;
