//! Download queues for pack content.
//!
//! This module provides the transfer side of an update:
//! - Content hash parsing and file verification (`checksum`)
//! - Single file transfers over HTTP or from local paths (`http`)
//! - Task descriptions (`task`)
//! - Queue lifecycle and failure records (`state`)
//! - Task- or byte-weighted progress (`progress`)
//! - The queue itself: retries, workers, and notifications (`queue`)
//!
//! # Architecture
//!
//! ```text
//! DownloadQueue
//!         │
//!         ├── worker threads (shared task cursor)
//!         │       └── Fetcher (trait)
//!         │               └── HttpFetcher
//!         │
//!         ├── ProgressCounters (atomics, polled at any time)
//!         │
//!         └── QueueListener (progress and finished events)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use packup::download::{DownloadQueue, DownloadTask, HttpFetcher, QueueConfig, QueueSpec};
//!
//! let tasks = vec![DownloadTask::new("https://example.com/core.jar", "mods/core.jar")];
//! let queue = DownloadQueue::new(
//!     QueueSpec::new("survival mods", tasks, "/srv/minecraft"),
//!     QueueConfig::default(),
//!     listener,
//!     Arc::new(HttpFetcher::new()?),
//! );
//! queue.start();
//! ```

mod checksum;
mod http;
mod progress;
mod queue;
mod state;
mod task;

pub use checksum::{
    calculate_file_checksum, matches_checksum, verify_checksum, ContentHash, HashAlgorithm,
};
pub use http::{Fetcher, HttpFetcher, DEFAULT_TIMEOUT_SECS};
pub use progress::{ProgressCounters, ProgressWeighting};
pub use queue::{
    DownloadQueue, QueueConfig, QueueId, QueueSpec, DEFAULT_CONCURRENCY, DEFAULT_MAX_ATTEMPTS,
};
pub use state::{QueueStatus, TaskFailure};
pub use task::DownloadTask;
