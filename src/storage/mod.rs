//! Storage layer for sace-queue.
//!
//! The queue only needs a durable string key-value primitive. This module
//! defines that seam ([`KeyValueStore`]) and provides:
//! - [`SqliteStore`]: persisted in `~/.sace-queue/queue.db`
//! - [`MemoryStore`]: in-process store for tests and embedding hosts

mod database;
mod kv;
mod memory;
mod migrations;

pub use database::Database;
pub use kv::{KeyValueStore, SqliteStore};
pub use memory::MemoryStore;
