//! Output formatting for sace-queue.
//!
//! This module renders queue data as colored text or JSON.

mod json;
mod pretty;

use chrono::{DateTime, Utc};

use crate::cli::args::OutputFormat;
use crate::connectivity::NetworkState;
use crate::error::QueueError;
use crate::sync::{OperationSummary, QueueStatus, QueuedOperation};

pub use json::*;
pub use pretty::*;

/// Format queue status based on output format
///
/// # Errors
///
/// Returns `QueueError::Parse` if JSON serialization fails.
pub fn format_status(
    status: &QueueStatus,
    network: Option<NetworkState>,
    format: OutputFormat,
) -> Result<String, QueueError> {
    match format {
        OutputFormat::Pretty => Ok(format_status_pretty(status, network)),
        OutputFormat::Json => format_status_json(status, network),
    }
}

/// Format the operation list based on output format
///
/// # Errors
///
/// Returns `QueueError::Parse` if JSON serialization fails.
pub fn format_operations(
    operations: &[OperationSummary],
    max_retries: u32,
    format: OutputFormat,
) -> Result<String, QueueError> {
    match format {
        OutputFormat::Pretty => Ok(format_operations_pretty(operations, max_retries)),
        OutputFormat::Json => format_operations_json(operations),
    }
}

/// Format a single queued operation based on output format
///
/// # Errors
///
/// Returns `QueueError::Parse` if JSON serialization fails.
pub fn format_operation(
    operation: &QueuedOperation,
    format: OutputFormat,
) -> Result<String, QueueError> {
    match format {
        OutputFormat::Pretty => format_operation_pretty(operation),
        OutputFormat::Json => to_json(operation),
    }
}

/// Format a connectivity change based on output format
///
/// # Errors
///
/// Returns `QueueError::Parse` if JSON serialization fails.
pub fn format_network_event(
    network: NetworkState,
    pending: usize,
    at: DateTime<Utc>,
    format: OutputFormat,
) -> Result<String, QueueError> {
    match format {
        OutputFormat::Pretty => Ok(format_network_event_pretty(network, pending, at)),
        OutputFormat::Json => format_network_event_json(network, pending, at),
    }
}
