//! Drain pass results.

use serde::Serialize;

/// How a call to `process_queue` ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DrainOutcome {
    /// Every entry of the loaded queue was attempted
    Completed,
    /// Connectivity was lost mid-pass; the rest was left untouched
    Interrupted,
    /// The device was offline; nothing was attempted
    Offline,
    /// Another pass was already running; nothing was attempted
    AlreadyRunning,
}

/// Result of one drain pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    /// How the pass ended
    pub outcome: DrainOutcome,
    /// Ids replayed and removed
    pub succeeded: Vec<String>,
    /// Ids that failed and stay queued with one more retry
    pub retrying: Vec<String>,
    /// Ids removed after exhausting their retries
    pub dropped: Vec<String>,
    /// Entries not attempted because the pass was interrupted
    pub skipped: usize,
}

impl DrainReport {
    /// Create an empty report.
    #[must_use]
    pub const fn new(outcome: DrainOutcome) -> Self {
        Self {
            outcome,
            succeeded: Vec::new(),
            retrying: Vec::new(),
            dropped: Vec::new(),
            skipped: 0,
        }
    }

    /// Entries the pass actually sent to the API.
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.succeeded.len() + self.retrying.len() + self.dropped.len()
    }

    /// Whether every attempted entry succeeded.
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.retrying.is_empty() && self.dropped.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_report() {
        let report = DrainReport::new(DrainOutcome::Completed);
        assert_eq!(report.attempted(), 0);
        assert!(report.all_succeeded());
    }

    #[test]
    fn test_counts() {
        let mut report = DrainReport::new(DrainOutcome::Interrupted);
        report.succeeded.push("a".to_string());
        report.retrying.push("b".to_string());
        report.dropped.push("c".to_string());
        report.skipped = 2;

        assert_eq!(report.attempted(), 3);
        assert!(!report.all_succeeded());
    }

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_string(&DrainOutcome::AlreadyRunning).unwrap();
        assert_eq!(json, "\"already_running\"");
    }
}
