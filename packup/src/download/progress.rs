//! Progress accounting for a download queue.
//!
//! Counters are atomics so the queue's workers can update them while any
//! thread polls the current fraction.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use super::task::DownloadTask;

/// How a queue turns task outcomes into a progress fraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressWeighting {
    /// Each task is one unit of work.
    Tasks,
    /// Each byte is one unit of work; used when every task declares a size.
    Bytes,
}

impl ProgressWeighting {
    /// Pick the weighting for a task list.
    ///
    /// Bytes are used only if every task has a non-zero declared size, so a
    /// queue never mixes schemes.
    pub fn for_tasks(tasks: &[DownloadTask]) -> Self {
        if !tasks.is_empty() && tasks.iter().all(|t| t.size.is_some_and(|s| s > 0)) {
            Self::Bytes
        } else {
            Self::Tasks
        }
    }
}

/// Shared progress counters for one queue.
#[derive(Debug)]
pub struct ProgressCounters {
    weighting: ProgressWeighting,
    /// Total work units.
    total_units: u64,
    /// Per-task bytes transferred so far.
    task_bytes: Vec<AtomicU64>,
    /// Number of tasks that succeeded.
    tasks_completed: AtomicUsize,
}

impl ProgressCounters {
    /// Create counters for a task list.
    pub fn new(tasks: &[DownloadTask]) -> Self {
        let weighting = ProgressWeighting::for_tasks(tasks);
        let total_units = match weighting {
            ProgressWeighting::Tasks => tasks.len() as u64,
            ProgressWeighting::Bytes => tasks.iter().filter_map(|t| t.size).sum(),
        };

        Self {
            weighting,
            total_units,
            task_bytes: (0..tasks.len()).map(|_| AtomicU64::new(0)).collect(),
            tasks_completed: AtomicUsize::new(0),
        }
    }

    pub fn weighting(&self) -> ProgressWeighting {
        self.weighting
    }

    /// Update the live byte count of an in-flight task.
    pub fn update_task(&self, index: usize, bytes: u64) {
        if let Some(counter) = self.task_bytes.get(index) {
            counter.store(bytes, Ordering::SeqCst);
        }
    }

    /// Mark a task as succeeded with its final byte count.
    pub fn mark_completed(&self, index: usize, final_bytes: u64) {
        if let Some(counter) = self.task_bytes.get(index) {
            counter.store(final_bytes, Ordering::SeqCst);
            self.tasks_completed.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Drop any partial byte count of a task that gave up.
    pub fn reset_task(&self, index: usize) {
        self.update_task(index, 0);
    }

    pub fn completed_tasks(&self) -> usize {
        self.tasks_completed.load(Ordering::SeqCst)
    }

    /// Total bytes transferred across all tasks.
    pub fn total_bytes(&self) -> u64 {
        self.task_bytes
            .iter()
            .map(|b| b.load(Ordering::SeqCst))
            .sum()
    }

    /// Current progress in `[0.0, 1.0]`.
    ///
    /// A queue with no work reports `1.0`.
    pub fn fraction(&self) -> f64 {
        if self.total_units == 0 {
            return 1.0;
        }

        let done = match self.weighting {
            ProgressWeighting::Tasks => self.completed_tasks() as u64,
            ProgressWeighting::Bytes => self.total_bytes(),
        };

        (done as f64 / self.total_units as f64).clamp(0.0, 1.0)
    }
}
