//! Configuration management for sace-queue.
//!
//! This module handles loading and saving configuration from `~/.sace-queue/`.

mod paths;
mod settings;

pub use paths::Paths;
pub use settings::{Config, ConnectivityConfig, LoggingConfig, QueueConfig};
