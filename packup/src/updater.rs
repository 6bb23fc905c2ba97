//! One update run, end to end.
//!
//! ```text
//! ManifestLoader ──► ManifestSet ─┐
//!                                 ├─► plan ─► QueueInstaller ─► QueueCoordinator
//! InstanceStore ──► InstanceRecord┘                                    │
//!        ▲                                                             │
//!        └──────────── record saved only when every queue completed ◄──┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};

use crate::coordinator::{CompletionSummary, CoordinatorEvent, QueueCoordinator};
use crate::error::{ManagerError, ManagerResult};
use crate::installer::{InstallRequest, Installer, QueueInstaller};
use crate::instance::InstanceStore;
use crate::listener::{StatusSink, TracingStatus};
use crate::manifest::{ManifestLoader, Side};
use crate::planner;

/// Parameters of an update run.
#[derive(Debug, Clone)]
pub struct UpdateRequest {
    /// Pack document location (URL or local path).
    pub pack_source: String,
    pub server_id: String,
    pub install_path: PathBuf,
    pub side: Side,
    /// Remove the previous run's files before downloading.
    pub clean: bool,
}

impl UpdateRequest {
    pub fn new(
        pack_source: impl Into<String>,
        server_id: impl Into<String>,
        install_path: impl Into<PathBuf>,
        side: Side,
    ) -> Self {
        Self {
            pack_source: pack_source.into(),
            server_id: server_id.into(),
            install_path: install_path.into(),
            side,
            clean: false,
        }
    }

    pub fn with_clean(mut self, clean: bool) -> Self {
        self.clean = clean;
        self
    }

    /// Reject requests that cannot describe a single installation.
    pub fn validate(&self) -> ManagerResult<()> {
        if self.side == Side::Both {
            return Err(ManagerError::InvalidConfig(
                "side must be client or server".to_string(),
            ));
        }
        if self.server_id.trim().is_empty() {
            return Err(ManagerError::InvalidConfig("server id is empty".to_string()));
        }
        Ok(())
    }
}

/// Summary of a successful run.
#[derive(Debug, Clone)]
pub struct UpdateReport {
    pub fingerprint: String,
    pub fingerprint_changed: bool,
    /// Install-relative files now recorded in the instance record.
    pub files: Vec<PathBuf>,
    pub removed: usize,
    pub summary: CompletionSummary,
}

/// Runs updates against one coordinator.
pub struct Updater {
    loader: Box<dyn ManifestLoader>,
    coordinator: Arc<QueueCoordinator>,
    cache_path: Option<PathBuf>,
    status: Arc<dyn StatusSink>,
}

impl Updater {
    pub fn new(loader: Box<dyn ManifestLoader>, coordinator: Arc<QueueCoordinator>) -> Self {
        Self {
            loader,
            coordinator,
            cache_path: None,
            status: Arc::new(TracingStatus),
        }
    }

    pub fn with_cache_path(mut self, cache_path: Option<PathBuf>) -> Self {
        self.cache_path = cache_path;
        self
    }

    pub fn with_status(mut self, status: Arc<dyn StatusSink>) -> Self {
        self.status = status;
        self
    }

    /// Perform one update run.
    ///
    /// `observer` sees every coordinator event while downloads are in
    /// flight. The instance record is written only if every queue completed.
    ///
    /// # Errors
    ///
    /// - manifest retrieval or parsing failures
    /// - installer validation failures (missing URL, malformed hash)
    /// - [`ManagerError::QueuesFailed`] when any download queue failed
    /// - failure to write the instance record
    pub fn run(
        &self,
        request: &UpdateRequest,
        observer: impl FnMut(&CoordinatorEvent),
    ) -> ManagerResult<UpdateReport> {
        request.validate()?;

        self.status
            .set_status(&format!("Loading pack {}", request.pack_source));
        let manifest = self.loader.load(&request.pack_source, &request.server_id)?;
        info!(
            server = %manifest.server_id(),
            modules = manifest.len(),
            "Manifest loaded"
        );

        let store = InstanceStore::new(&request.install_path);
        let previous = store.load();
        let previous_files = previous.files.clone();

        let plan = planner::plan(&manifest, request.side, previous);
        debug!(
            fingerprint = %plan.record.fingerprint,
            changed = plan.fingerprint_changed,
            modules = plan.install_set.modules.len(),
            configs = plan.install_set.configs.len(),
            "Update planned"
        );
        if !plan.fingerprint_changed {
            self.status.log("Pack content unchanged; verifying installed files");
        }

        let installer = QueueInstaller::new(Arc::clone(&self.coordinator))
            .with_cache_path(self.cache_path.clone())
            .with_status(Arc::clone(&self.status));
        let outcome = installer.install(InstallRequest {
            install_set: &plan.install_set,
            server_id: manifest.server_id(),
            install_path: &request.install_path,
            previous_files: &previous_files,
            clean: request.clean,
        })?;

        self.status.set_status("Downloading");
        let summary = self.coordinator.wait_for_completion(observer);

        if !summary.is_success() {
            for failed in &summary.failed {
                for failure in &failed.failures {
                    self.status.alert(&format!("{}: {}", failed.name, failure));
                }
            }
            return Err(ManagerError::QueuesFailed {
                queues: summary.failed.iter().map(|q| q.describe()).collect(),
            });
        }

        let mut record = plan.record;
        record.files = outcome.files.clone();
        store.save(&record)?;
        self.status.set_status("Update complete");

        Ok(UpdateReport {
            fingerprint: record.fingerprint,
            fingerprint_changed: plan.fingerprint_changed,
            files: outcome.files,
            removed: outcome.removed,
            summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_both() {
        let request = UpdateRequest::new("pack.json", "s1", "/tmp/x", Side::Both);
        assert!(matches!(
            request.validate(),
            Err(ManagerError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_validate_rejects_empty_server() {
        let request = UpdateRequest::new("pack.json", " ", "/tmp/x", Side::Client);
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_client_and_server() {
        for side in [Side::Client, Side::Server] {
            let request = UpdateRequest::new("pack.json", "s1", "/tmp/x", side).with_clean(true);
            assert!(request.validate().is_ok());
            assert!(request.clean);
        }
    }
}
