//! Queue lifecycle states and per-task failure records.

use std::fmt;
use std::path::PathBuf;

/// Lifecycle of a download queue.
///
/// `Created → Running → {Completed | Failed}`; terminal states are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueStatus {
    /// Constructed but not started.
    Created,
    /// Tasks are being processed.
    Running,
    /// Every task succeeded.
    Completed,
    /// At least one task exhausted its attempts.
    Failed,
}

impl QueueStatus {
    /// Check if the status is terminal.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Get a human-readable name for the status.
    pub fn name(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A task that exhausted its attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
    /// Index of the task within its queue.
    pub index: usize,
    /// Source the task was fetched from.
    pub source: String,
    /// Destination relative to the queue's base path.
    pub destination: PathBuf,
    /// Error from the last attempt.
    pub reason: String,
    /// Number of attempts made.
    pub attempts: u32,
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} from {} after {} attempt(s): {}",
            self.destination.display(),
            self.source,
            self.attempts,
            self.reason
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!QueueStatus::Created.is_terminal());
        assert!(!QueueStatus::Running.is_terminal());
        assert!(QueueStatus::Completed.is_terminal());
        assert!(QueueStatus::Failed.is_terminal());
    }

    #[test]
    fn test_task_failure_display() {
        let failure = TaskFailure {
            index: 1,
            source: "https://example.com/core.jar".to_string(),
            destination: PathBuf::from("mods/core.jar"),
            reason: "connection reset".to_string(),
            attempts: 3,
        };

        let msg = failure.to_string();
        assert!(msg.contains("mods/core.jar"));
        assert!(msg.contains("after 3 attempt(s)"));
        assert!(msg.contains("connection reset"));
    }
}
