//! Command implementations for sace-queue.

mod queue;

pub use queue::{add, clear, list, show, status, watch, QueueContext};
