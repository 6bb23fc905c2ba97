//! Events emitted by the queue coordinator.

use crate::download::{QueueStatus, TaskFailure};

/// Something the owner of a [`QueueCoordinator`](super::QueueCoordinator)
/// may want to display or react to.
#[derive(Debug, Clone, PartialEq)]
pub enum CoordinatorEvent {
    /// A queue advanced.
    Progress {
        queue: String,
        /// Progress of that queue in `[0.0, 1.0]`.
        queue_fraction: f64,
        /// Mean progress of every queue still tracked.
        overall: f64,
    },
    /// A queue reached its terminal state and left the set.
    QueueFinished {
        name: String,
        status: QueueStatus,
        failures: Vec<TaskFailure>,
    },
    /// The set became empty.
    AllComplete(CompletionSummary),
}

/// A queue that finished in the `Failed` state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedQueue {
    pub name: String,
    pub failures: Vec<TaskFailure>,
}

impl FailedQueue {
    /// One-line description naming the files that failed.
    pub fn describe(&self) -> String {
        let files: Vec<String> = self
            .failures
            .iter()
            .map(|f| f.destination.display().to_string())
            .collect();
        format!("{} ({})", self.name, files.join(", "))
    }
}

/// Outcome of every queue tracked since the set was last empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionSummary {
    pub completed: Vec<String>,
    pub failed: Vec<FailedQueue>,
}

impl CompletionSummary {
    /// True when no queue failed.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Append the outcomes of `other`.
    pub fn merge(&mut self, other: CompletionSummary) {
        self.completed.extend(other.completed);
        self.failed.extend(other.failed);
    }

    pub(crate) fn record(&mut self, name: String, status: QueueStatus, failures: Vec<TaskFailure>) {
        if status == QueueStatus::Failed {
            self.failed.push(FailedQueue { name, failures });
        } else {
            self.completed.push(name);
        }
    }
}
