//! Packup - modpack installer and updater
//!
//! This library installs and updates a client or server modpack described by
//! a remote pack document into a local directory. It remembers which optional
//! modules were chosen, fingerprints the desired content, and downloads files
//! through concurrent, verified download queues.

pub mod config;
pub mod coordinator;
pub mod download;
pub mod error;
pub mod installer;
pub mod instance;
pub mod listener;
pub mod logging;
pub mod manifest;
pub mod planner;
pub mod updater;

pub use coordinator::{CompletionSummary, CoordinatorEvent, QueueCoordinator};
pub use error::{ManagerError, ManagerResult};
pub use manifest::{ManifestSet, Module, Side};
pub use updater::{UpdateReport, UpdateRequest, Updater};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
