//! JSON output formatting for sace-queue.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::json;

use crate::connectivity::NetworkState;
use crate::error::QueueError;
use crate::sync::{OperationSummary, QueueStatus};

/// Format queue status as JSON
///
/// # Errors
///
/// Returns `QueueError::Parse` if JSON serialization fails.
pub fn format_status_json(
    status: &QueueStatus,
    network: Option<NetworkState>,
) -> Result<String, QueueError> {
    let mut output = json!({
        "count": status.count,
        "oldest": status
            .oldest()
            .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true)),
        "operations": status.operations,
    });

    if let Some(network) = network {
        output["network"] = json!({
            "isConnected": network.is_connected,
            "isInternetReachable": network.is_internet_reachable,
            "online": network.is_online(),
        });
    }

    Ok(serde_json::to_string_pretty(&output)?)
}

/// Format one connectivity change as a single JSON line
///
/// # Errors
///
/// Returns `QueueError::Parse` if JSON serialization fails.
pub fn format_network_event_json(
    network: NetworkState,
    pending: usize,
    at: DateTime<Utc>,
) -> Result<String, QueueError> {
    let output = json!({
        "at": at.to_rfc3339_opts(SecondsFormat::Millis, true),
        "network": network,
        "online": network.is_online(),
        "pending": pending,
    });
    Ok(serde_json::to_string(&output)?)
}

/// Format queued operations as JSON
///
/// # Errors
///
/// Returns `QueueError::Parse` if JSON serialization fails.
pub fn format_operations_json(operations: &[OperationSummary]) -> Result<String, QueueError> {
    let output = json!({
        "count": operations.len(),
        "items": operations
    });
    Ok(serde_json::to_string_pretty(&output)?)
}

/// Serialize any value to pretty JSON.
///
/// # Errors
///
/// Returns `QueueError::Parse` if JSON serialization fails.
pub fn to_json<T: Serialize>(value: &T) -> Result<String, QueueError> {
    Ok(serde_json::to_string_pretty(value)?)
}
