//! Narrow capabilities the engine uses to talk to its host.
//!
//! Each trait covers one concern so hosts and tests implement only what they
//! need:
//! - [`StatusSink`]: human-facing log, alert and status lines
//! - [`QueueListener`]: lifecycle events of download queues
//! - [`QueueSubmitter`]: creation and registration of download queues

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use crate::download::{DownloadQueue, DownloadTask};

/// Receives human-facing messages.
pub trait StatusSink: Send + Sync {
    /// An informational message.
    fn log(&self, message: &str);

    /// A non-fatal warning.
    fn alert(&self, message: &str);

    /// The current phase of the run.
    fn set_status(&self, message: &str);
}

/// [`StatusSink`] that forwards to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingStatus;

impl StatusSink for TracingStatus {
    fn log(&self, message: &str) {
        info!("{}", message);
    }

    fn alert(&self, message: &str) {
        warn!("{}", message);
    }

    fn set_status(&self, message: &str) {
        info!(status = message, "Status: {}", message);
    }
}

/// Receives lifecycle events from download queues.
///
/// Implementations may be called concurrently from several queues' worker
/// threads and must return promptly.
pub trait QueueListener: Send + Sync {
    /// A task of `queue` reached an outcome and the queue is still running.
    fn on_queue_progress(&self, queue: &DownloadQueue);

    /// `queue` reached its terminal state. Called once per queue.
    fn on_queue_finished(&self, queue: &DownloadQueue);
}

/// Creates download queues and registers them for tracking.
pub trait QueueSubmitter: Send + Sync {
    /// Build a queue over `tasks`, register it, and return it unstarted.
    ///
    /// Task destinations are resolved against `base_path`. Verified files are
    /// cached under `cache_path` when one is given.
    fn submit_queue(
        &self,
        name: &str,
        parent: &str,
        tasks: Vec<DownloadTask>,
        base_path: &Path,
        cache_path: Option<&Path>,
    ) -> Arc<DownloadQueue>;
}
