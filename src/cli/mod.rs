//! Command-line interface for inspecting the offline queue.

pub mod args;
pub mod commands;
