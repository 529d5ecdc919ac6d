use chrono::{DateTime, Utc};
use colored::Colorize;

use crate::connectivity::NetworkState;
use crate::error::QueueError;
use crate::sync::{Mutation, OperationSummary, QueueStatus, QueuedOperation};

/// Format queue status as a summary block
pub fn format_status_pretty(status: &QueueStatus, network: Option<NetworkState>) -> String {
    let mut lines = Vec::new();

    lines.push("Offline Queue Status".bold().to_string());
    lines.push("─".repeat(40));

    lines.push(format!(
        "  Pending:    {} {}",
        status.count,
        if status.count > 0 {
            "operations waiting".dimmed()
        } else {
            "".dimmed()
        }
    ));

    if let Some(oldest) = status.oldest() {
        lines.push(format!("  Oldest:     {}", format_age(oldest, Utc::now()).dimmed()));
    }

    let retrying = status.operations.iter().filter(|op| op.retries > 0).count();
    if retrying > 0 {
        lines.push(format!(
            "  Retrying:   {} {}",
            retrying,
            "operations failed at least once".red()
        ));
    }

    if let Some(network) = network {
        let state = if network.is_online() {
            "online".green()
        } else {
            "offline".red()
        };
        lines.push(format!("  Network:    {state}"));
    }

    lines.join("\n")
}

/// Format one connectivity change as a single line
pub fn format_network_event_pretty(
    network: NetworkState,
    pending: usize,
    at: DateTime<Utc>,
) -> String {
    let state = if network.is_online() {
        "online ".green()
    } else {
        "offline".red()
    };
    format!(
        "{} {state}  {pending} pending",
        at.format("%H:%M:%S").to_string().dimmed()
    )
}

/// Format queued operations as a table, showing retries against `max_retries`
pub fn format_operations_pretty(operations: &[OperationSummary], max_retries: u32) -> String {
    if operations.is_empty() {
        return "No operations in queue.".to_string();
    }

    let mut lines = Vec::new();

    lines.push(format!("Queued Operations ({})", operations.len()));
    lines.push("─".repeat(72));
    lines.push(format!(
        "{:<24} {:<18} {:<20} {}",
        "ID", "Type", "Queued", "Retries"
    ));
    lines.push("─".repeat(72));

    for op in operations {
        let retries = format!("{}/{max_retries}", op.retries);
        let retries = if op.retries > 0 {
            retries.yellow().to_string()
        } else {
            retries
        };

        lines.push(format!(
            "{:<24} {:<18} {:<20} {}",
            op.id,
            op.kind,
            format_timestamp(op.timestamp, "%Y-%m-%d %H:%M"),
            retries
        ));
    }

    lines.join("\n")
}

/// Format one queued operation with its payload
///
/// # Errors
///
/// Returns `QueueError::Parse` if the payload cannot be serialized.
pub fn format_operation_pretty(operation: &QueuedOperation) -> Result<String, QueueError> {
    let mut output = format!("{}\n", operation.id.bold());
    output.push_str(&format!("  {}: {}\n", "Type".dimmed(), operation.mutation.kind()));

    if let Some(registro_id) = operation.mutation.registro_id() {
        output.push_str(&format!("  {}: {}\n", "Register".dimmed(), registro_id));
    }

    output.push_str(&format!(
        "  {}: {}\n",
        "Queued".dimmed(),
        format_timestamp(operation.timestamp, "%Y-%m-%d %H:%M:%S UTC")
    ));
    output.push_str(&format!("  {}: {}\n", "Retries".dimmed(), operation.retries));

    if let Mutation::Unrecognized { reason, .. } = &operation.mutation {
        output.push_str(&format!("  {}: {}\n", "Problem".dimmed(), reason.red()));
    }

    let data = serde_json::to_value(operation)?;
    output.push_str(&format!(
        "  {}:\n{}",
        "Data".dimmed(),
        serde_json::to_string_pretty(&data["data"])?
    ));

    Ok(output)
}

fn format_timestamp(time: Option<DateTime<Utc>>, pattern: &str) -> String {
    time.map_or_else(|| "unknown".to_string(), |t| t.format(pattern).to_string())
}

/// Describe how long ago `time` was.
#[must_use]
pub fn format_age(time: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let age = now.signed_duration_since(time);
    if age.num_days() > 0 {
        format!("{} days ago", age.num_days())
    } else if age.num_hours() > 0 {
        format!("{} hours ago", age.num_hours())
    } else if age.num_minutes() > 0 {
        format!("{} minutes ago", age.num_minutes())
    } else {
        "just now".to_string()
    }
}
