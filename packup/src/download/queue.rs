//! Download queue: a fixed task list driven to a single terminal state.
//!
//! A queue owns its tasks and processes them on `concurrency` worker threads
//! that pull task indices from a shared cursor (one worker is sequential).
//! Each task is tried up to `max_attempts` times; a task that exhausts its
//! attempts is recorded as a [`TaskFailure`] while the remaining tasks keep
//! going. Once every task has an outcome, the queue becomes `Completed` or
//! `Failed` and notifies its listener exactly once.
//!
//! Notifications for one queue are serialized, so a progress event never
//! follows the finished event of the same queue.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::checksum::{matches_checksum, verify_checksum, ContentHash};
use super::http::Fetcher;
use super::progress::{ProgressCounters, ProgressWeighting};
use super::state::{QueueStatus, TaskFailure};
use super::task::DownloadTask;
use crate::error::{ManagerError, ManagerResult};
use crate::listener::QueueListener;

/// Default number of attempts per task.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default number of concurrent transfers per queue.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Global counter for queue identities.
static QUEUE_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Identity of a download queue, unique within the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueueId(u64);

impl QueueId {
    fn next() -> Self {
        Self(QUEUE_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for QueueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Execution settings for a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueConfig {
    /// Worker threads per queue (minimum 1).
    pub concurrency: usize,
    /// Attempts per task before it is recorded as failed (minimum 1).
    pub max_attempts: u32,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl QueueConfig {
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }
}

/// Construction parameters of a queue.
#[derive(Debug, Clone)]
pub struct QueueSpec {
    pub name: String,
    /// Display grouping only.
    pub parent: String,
    pub tasks: Vec<DownloadTask>,
    pub base_path: PathBuf,
    pub cache_path: Option<PathBuf>,
}

impl QueueSpec {
    pub fn new(name: impl Into<String>, tasks: Vec<DownloadTask>, base_path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            parent: String::new(),
            tasks,
            base_path: base_path.into(),
            cache_path: None,
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = parent.into();
        self
    }

    pub fn with_cache_path(mut self, cache_path: Option<PathBuf>) -> Self {
        self.cache_path = cache_path;
        self
    }
}

/// A bounded pipeline of file transfers with progress and completion reporting.
pub struct DownloadQueue {
    id: QueueId,
    name: String,
    parent: String,
    tasks: Vec<DownloadTask>,
    base_path: PathBuf,
    cache_path: Option<PathBuf>,
    config: QueueConfig,
    listener: Arc<dyn QueueListener>,
    fetcher: Arc<dyn Fetcher>,
    status: Mutex<QueueStatus>,
    counters: ProgressCounters,
    /// Next task index to hand to a worker.
    cursor: AtomicUsize,
    /// Tasks with an outcome, guarded so notifications are serialized.
    settled: Mutex<usize>,
    failures: Mutex<Vec<TaskFailure>>,
    finished: AtomicBool,
}

impl fmt::Debug for DownloadQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadQueue")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("tasks", &self.tasks.len())
            .field("status", &self.status())
            .finish()
    }
}

impl DownloadQueue {
    /// Create a queue in the `Created` state.
    pub fn new(
        spec: QueueSpec,
        config: QueueConfig,
        listener: Arc<dyn QueueListener>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Arc<Self> {
        let counters = ProgressCounters::new(&spec.tasks);
        Arc::new(Self {
            id: QueueId::next(),
            name: spec.name,
            parent: spec.parent,
            tasks: spec.tasks,
            base_path: spec.base_path,
            cache_path: spec.cache_path,
            config: QueueConfig::default()
                .with_concurrency(config.concurrency)
                .with_max_attempts(config.max_attempts),
            listener,
            fetcher,
            status: Mutex::new(QueueStatus::Created),
            counters,
            cursor: AtomicUsize::new(0),
            settled: Mutex::new(0),
            failures: Mutex::new(Vec::new()),
            finished: AtomicBool::new(false),
        })
    }

    pub fn id(&self) -> QueueId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> &str {
        &self.parent
    }

    pub fn tasks(&self) -> &[DownloadTask] {
        &self.tasks
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn status(&self) -> QueueStatus {
        *self.status.lock()
    }

    /// Weighting scheme used by [`progress`](Self::progress).
    pub fn weighting(&self) -> ProgressWeighting {
        self.counters.weighting()
    }

    /// Current progress in `[0.0, 1.0]`. Safe to call at any time.
    pub fn progress(&self) -> f64 {
        self.counters.fraction()
    }

    /// Tasks that exhausted their attempts so far.
    pub fn failures(&self) -> Vec<TaskFailure> {
        self.failures.lock().clone()
    }

    /// Begin processing.
    ///
    /// Returns `false` without doing anything if the queue was already
    /// started or is terminal.
    pub fn start(self: &Arc<Self>) -> bool {
        {
            let mut status = self.status.lock();
            if *status != QueueStatus::Created {
                return false;
            }
            *status = QueueStatus::Running;
        }

        info!(
            queue = %self.name,
            id = %self.id,
            tasks = self.tasks.len(),
            weighting = ?self.weighting(),
            "Download queue started"
        );

        if self.tasks.is_empty() {
            self.finish();
            return true;
        }

        let workers = self.config.concurrency.min(self.tasks.len());
        for _ in 0..workers {
            let queue = Arc::clone(self);
            thread::spawn(move || queue.work());
        }

        true
    }

    fn work(&self) {
        loop {
            let index = self.cursor.fetch_add(1, Ordering::SeqCst);
            if index >= self.tasks.len() {
                break;
            }
            let outcome = self.run_task(index);
            self.settle(index, outcome);
        }
    }

    /// Record a task outcome and notify the listener.
    fn settle(&self, index: usize, outcome: Result<u64, TaskFailure>) {
        match outcome {
            Ok(bytes) => {
                let units = self.tasks[index].size.unwrap_or(bytes);
                self.counters.mark_completed(index, units);
            }
            Err(failure) => {
                warn!(queue = %self.name, failure = %failure, "Task failed");
                self.counters.reset_task(index);
                self.failures.lock().push(failure);
            }
        }

        let mut settled = self.settled.lock();
        *settled += 1;
        if *settled == self.tasks.len() {
            self.finish();
        } else {
            self.listener.on_queue_progress(self);
        }
    }

    /// Move to the terminal state and notify the listener once.
    fn finish(&self) {
        let terminal = if self.failures.lock().is_empty() {
            QueueStatus::Completed
        } else {
            QueueStatus::Failed
        };

        {
            let mut status = self.status.lock();
            if status.is_terminal() {
                return;
            }
            *status = terminal;
        }

        if self.finished.swap(true, Ordering::SeqCst) {
            return;
        }

        match terminal {
            QueueStatus::Completed => info!(queue = %self.name, "Download queue completed"),
            _ => warn!(
                queue = %self.name,
                failed = self.failures.lock().len(),
                "Download queue failed"
            ),
        }

        self.listener.on_queue_finished(self);
    }

    fn run_task(&self, index: usize) -> Result<u64, TaskFailure> {
        let task = &self.tasks[index];
        let dest = self.base_path.join(&task.destination);

        if let Some(expected) = &task.expected_hash {
            if matches_checksum(&dest, expected) {
                debug!(file = %task.destination.display(), "Already up to date");
                return Ok(file_len(&dest));
            }
            if let Some(bytes) = self.restore_from_cache(expected, &dest) {
                debug!(file = %task.destination.display(), "Restored from cache");
                return Ok(bytes);
            }
        }

        let mut last_error = String::new();
        for attempt in 1..=self.config.max_attempts {
            match self.attempt(index, task, &dest) {
                Ok(bytes) => {
                    if let Some(expected) = &task.expected_hash {
                        self.store_in_cache(expected, &dest);
                    }
                    return Ok(bytes);
                }
                Err(e) => {
                    debug!(
                        file = %task.destination.display(),
                        attempt,
                        max_attempts = self.config.max_attempts,
                        error = %e,
                        "Download attempt failed"
                    );
                    self.counters.reset_task(index);
                    last_error = e.to_string();
                }
            }
        }

        Err(TaskFailure {
            index,
            source: task.source.clone(),
            destination: task.destination.clone(),
            reason: last_error,
            attempts: self.config.max_attempts,
        })
    }

    /// One transfer plus verification.
    fn attempt(&self, index: usize, task: &DownloadTask, dest: &Path) -> ManagerResult<u64> {
        let counters = &self.counters;
        let bytes = self
            .fetcher
            .fetch(&task.source, dest, &|b| counters.update_task(index, b))?;

        if let Some(expected) = &task.expected_hash {
            if let Err(e) = verify_checksum(dest, expected) {
                fs::remove_file(dest).ok();
                return Err(e);
            }
        }

        Ok(bytes)
    }

    fn cache_entry(&self, hash: &ContentHash) -> Option<PathBuf> {
        self.cache_path.as_ref().map(|dir| dir.join(hash.as_hex()))
    }

    fn restore_from_cache(&self, hash: &ContentHash, dest: &Path) -> Option<u64> {
        let entry = self.cache_entry(hash)?;
        if !matches_checksum(&entry, hash) {
            return None;
        }
        copy_file(&entry, dest)
            .map_err(|e| debug!(error = %e, "Cache restore failed"))
            .ok()
    }

    fn store_in_cache(&self, hash: &ContentHash, dest: &Path) {
        if let Some(entry) = self.cache_entry(hash) {
            if let Err(e) = copy_file(dest, &entry) {
                debug!(error = %e, "Cache store failed");
            }
        }
    }
}

fn file_len(path: &Path) -> u64 {
    path.metadata().map(|m| m.len()).unwrap_or(0)
}

fn copy_file(from: &Path, to: &Path) -> ManagerResult<u64> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(|e| ManagerError::CreateDirFailed {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    fs::copy(from, to).map_err(|e| ManagerError::WriteFailed {
        path: to.to_path_buf(),
        source: e,
    })
}
