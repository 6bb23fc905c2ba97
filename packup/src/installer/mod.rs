//! Turning an install set into running download queues.
//!
//! The installer workflow:
//! 1. Validate every selected entry (download URL present, hash well-formed)
//! 2. Remove files left by the previous run when a clean install is requested
//! 3. Submit one queue for modules and one for config files
//! 4. Start both queues
//!
//! Validation happens before anything is removed or submitted, so a bad
//! manifest leaves the install directory untouched.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::download::{ContentHash, DownloadQueue, DownloadTask};
use crate::error::{ManagerError, ManagerResult};
use crate::listener::{QueueSubmitter, StatusSink, TracingStatus};
use crate::planner::InstallSet;

/// Installation stages for status reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStage {
    /// Checking the install set.
    Validating,
    /// Removing files of the previous run.
    Cleaning,
    /// Submitting and starting download queues.
    Queueing,
}

impl InstallStage {
    /// Get a human-readable name for the stage.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Validating => "Validating",
            Self::Cleaning => "Cleaning",
            Self::Queueing => "Queueing downloads",
        }
    }
}

/// Everything an installer needs for one run.
#[derive(Debug, Clone, Copy)]
pub struct InstallRequest<'a> {
    pub install_set: &'a InstallSet<'a>,
    /// Server id; also the display parent of the queues.
    pub server_id: &'a str,
    pub install_path: &'a Path,
    /// Install-relative files written by the previous successful run.
    pub previous_files: &'a [PathBuf],
    /// Remove `previous_files` before downloading.
    pub clean: bool,
}

/// Result of a successful [`Installer::install`].
#[derive(Debug, Clone)]
pub struct InstallOutcome {
    /// Started queues; they finish asynchronously.
    pub queues: Vec<Arc<DownloadQueue>>,
    /// Install-relative destination of every queued file.
    pub files: Vec<PathBuf>,
    /// Number of previous files removed by a clean install.
    pub removed: usize,
}

/// Materializes an install set into the install directory.
pub trait Installer: Send + Sync {
    /// Queue the downloads for `request`.
    ///
    /// Errors abort the run before any queue is submitted.
    fn install(&self, request: InstallRequest<'_>) -> ManagerResult<InstallOutcome>;
}

/// [`Installer`] that submits download queues through a [`QueueSubmitter`].
pub struct QueueInstaller<S: QueueSubmitter> {
    submitter: Arc<S>,
    cache_path: Option<PathBuf>,
    status: Arc<dyn StatusSink>,
}

impl<S: QueueSubmitter> QueueInstaller<S> {
    /// Create an installer that reports status through `tracing`.
    pub fn new(submitter: Arc<S>) -> Self {
        Self {
            submitter,
            cache_path: None,
            status: Arc::new(TracingStatus),
        }
    }

    /// Keep verified downloads in `cache_path` for reuse.
    pub fn with_cache_path(mut self, cache_path: Option<PathBuf>) -> Self {
        self.cache_path = cache_path;
        self
    }

    pub fn with_status(mut self, status: Arc<dyn StatusSink>) -> Self {
        self.status = status;
        self
    }

    fn report(&self, stage: InstallStage, message: &str) {
        self.status
            .set_status(&format!("{}: {}", stage.name(), message));
    }

    /// Remove files of the previous run, skipping anything outside the
    /// install directory.
    fn clean(&self, install_path: &Path, files: &[PathBuf]) -> usize {
        let mut removed = 0;
        for file in files {
            if !is_contained(file) {
                self.status.alert(&format!(
                    "Not removing {}: outside the install directory",
                    file.display()
                ));
                continue;
            }

            let path = install_path.join(file);
            match fs::remove_file(&path) {
                Ok(()) => {
                    debug!(file = %file.display(), "Removed");
                    removed += 1;
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => self
                    .status
                    .alert(&format!("Failed to remove {}: {}", path.display(), e)),
            }
        }
        removed
    }
}

impl<S: QueueSubmitter> Installer for QueueInstaller<S> {
    fn install(&self, request: InstallRequest<'_>) -> ManagerResult<InstallOutcome> {
        self.report(
            InstallStage::Validating,
            &format!(
                "{} module(s), {} config file(s)",
                request.install_set.modules.len(),
                request.install_set.configs.len()
            ),
        );
        let module_tasks = module_tasks(request.install_set)?;
        let config_tasks = config_tasks(request.install_set)?;

        let removed = if request.clean {
            self.report(
                InstallStage::Cleaning,
                &format!("{} previous file(s)", request.previous_files.len()),
            );
            self.clean(request.install_path, request.previous_files)
        } else {
            0
        };

        let files: Vec<PathBuf> = module_tasks
            .iter()
            .chain(config_tasks.iter())
            .map(|t| t.destination.clone())
            .collect();

        self.report(
            InstallStage::Queueing,
            &format!("{} file(s) for {}", files.len(), request.server_id),
        );

        let cache = self.cache_path.as_deref();
        let queues = vec![
            self.submitter.submit_queue(
                &format!("{} mods", request.server_id),
                request.server_id,
                module_tasks,
                request.install_path,
                cache,
            ),
            self.submitter.submit_queue(
                &format!("{} configs", request.server_id),
                request.server_id,
                config_tasks,
                request.install_path,
                cache,
            ),
        ];

        // Both are registered before either starts so neither can empty
        // the set early
        for queue in &queues {
            queue.start();
        }

        info!(
            server = %request.server_id,
            files = files.len(),
            removed,
            "Downloads queued"
        );

        Ok(InstallOutcome {
            queues,
            files,
            removed,
        })
    }
}

/// Build download tasks for the selected modules and sub-modules.
pub fn module_tasks(install_set: &InstallSet<'_>) -> ManagerResult<Vec<DownloadTask>> {
    install_set
        .modules
        .iter()
        .map(|selected| {
            let url = selected.url().ok_or_else(|| ManagerError::MissingResource {
                module: selected.id().to_string(),
                what: "a download URL".to_string(),
            })?;
            let destination = contained_destination(selected.id(), selected.install_path())?;
            Ok(DownloadTask::new(url, destination)
                .with_optional_hash(ContentHash::parse_optional(selected.content_hash())?)
                .with_optional_size(selected.size()))
        })
        .collect()
}

/// Build download tasks for the selected config files.
pub fn config_tasks(install_set: &InstallSet<'_>) -> ManagerResult<Vec<DownloadTask>> {
    install_set
        .configs
        .iter()
        .map(|config| {
            let url = config.url.as_deref().ok_or_else(|| ManagerError::MissingResource {
                module: config.path.display().to_string(),
                what: "a download URL".to_string(),
            })?;
            let destination =
                contained_destination(&config.path.display().to_string(), config.path.clone())?;
            Ok(DownloadTask::new(url, destination)
                .with_optional_hash(ContentHash::parse_optional(&config.content_hash)?))
        })
        .collect()
}

/// Reject destinations that would land outside the install directory.
fn contained_destination(module: &str, destination: PathBuf) -> ManagerResult<PathBuf> {
    if is_contained(&destination) {
        Ok(destination)
    } else {
        Err(ManagerError::MissingResource {
            module: module.to_string(),
            what: format!(
                "a destination inside the install directory (got {})",
                destination.display()
            ),
        })
    }
}

/// True for relative paths that cannot climb out of their base.
fn is_contained(path: &Path) -> bool {
    path.components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::{QueueConfig, QueueSpec, QueueStatus};
    use crate::instance::InstanceRecord;
    use crate::listener::QueueListener;
    use crate::manifest::{ConfigFile, ManifestSet, Module, Side, SubModule};
    use crate::planner::select_install_set;
    use parking_lot::Mutex;
    use tempfile::TempDir;

    const HASH: &str = "5eb63bbbe01eeed093cb22bb8f5acdc3";

    struct NoopListener;

    impl QueueListener for NoopListener {
        fn on_queue_progress(&self, _queue: &DownloadQueue) {}
        fn on_queue_finished(&self, _queue: &DownloadQueue) {}
    }

    struct NoopFetcher;

    impl crate::download::Fetcher for NoopFetcher {
        fn fetch(&self, _source: &str, _dest: &Path, _on_progress: &dyn Fn(u64)) -> ManagerResult<u64> {
            Ok(0)
        }
    }

    /// Records submitted queues without running real transfers.
    #[derive(Default)]
    struct RecordingSubmitter {
        submitted: Mutex<Vec<(String, String, Vec<DownloadTask>)>>,
    }

    impl QueueSubmitter for RecordingSubmitter {
        fn submit_queue(
            &self,
            name: &str,
            parent: &str,
            tasks: Vec<DownloadTask>,
            base_path: &Path,
            _cache_path: Option<&Path>,
        ) -> Arc<DownloadQueue> {
            self.submitted
                .lock()
                .push((name.to_string(), parent.to_string(), tasks.clone()));
            DownloadQueue::new(
                QueueSpec::new(name, Vec::new(), base_path).with_parent(parent),
                QueueConfig::default(),
                Arc::new(NoopListener),
                Arc::new(NoopFetcher),
            )
        }
    }

    fn manifest() -> ManifestSet {
        ManifestSet::from_modules(
            "s1",
            vec![
                Module::new("core")
                    .with_hash(HASH)
                    .with_url("https://example.com/core.jar")
                    .with_size(11)
                    .with_sub_module(
                        SubModule::new("core-extra", Side::Both, "")
                            .with_url("https://example.com/extra.jar"),
                    )
                    .with_config(
                        ConfigFile::new("config/core.cfg", "")
                            .with_url("https://example.com/core.cfg"),
                    ),
            ],
        )
        .unwrap()
    }

    fn request<'a>(set: &'a InstallSet<'a>, path: &'a Path, previous: &'a [PathBuf]) -> InstallRequest<'a> {
        InstallRequest {
            install_set: set,
            server_id: "s1",
            install_path: path,
            previous_files: previous,
            clean: false,
        }
    }

    #[test]
    fn test_install_submits_mods_and_configs_queues() {
        let temp = TempDir::new().unwrap();
        let manifest = manifest();
        let set = select_install_set(&manifest, Side::Server, &InstanceRecord::new());
        let submitter = Arc::new(RecordingSubmitter::default());
        let installer = QueueInstaller::new(Arc::clone(&submitter));

        let outcome = installer.install(request(&set, temp.path(), &[])).unwrap();

        let submitted = submitter.submitted.lock();
        assert_eq!(submitted.len(), 2);
        assert_eq!(submitted[0].0, "s1 mods");
        assert_eq!(submitted[0].1, "s1");
        assert_eq!(submitted[0].2.len(), 2);
        assert_eq!(submitted[0].2[0].size, Some(11));
        assert!(submitted[0].2[0].expected_hash.is_some());
        assert!(submitted[0].2[1].expected_hash.is_none());
        assert_eq!(submitted[1].0, "s1 configs");
        assert_eq!(submitted[1].2[0].destination, PathBuf::from("config/core.cfg"));

        assert_eq!(
            outcome.files,
            vec![
                PathBuf::from("mods/core.jar"),
                PathBuf::from("mods/core-extra.jar"),
                PathBuf::from("config/core.cfg"),
            ]
        );
        assert!(outcome.queues.iter().all(|q| q.status() == QueueStatus::Completed));
    }

    #[test]
    fn test_missing_url_is_fatal_before_submit() {
        let temp = TempDir::new().unwrap();
        let manifest =
            ManifestSet::from_modules("s1", vec![Module::new("core").with_hash(HASH)]).unwrap();
        let set = select_install_set(&manifest, Side::Server, &InstanceRecord::new());
        let submitter = Arc::new(RecordingSubmitter::default());
        let installer = QueueInstaller::new(Arc::clone(&submitter));

        let result = installer.install(request(&set, temp.path(), &[]));

        match result {
            Err(ManagerError::MissingResource { module, .. }) => assert_eq!(module, "core"),
            other => panic!("Expected MissingResource, got {:?}", other.map(|o| o.files)),
        }
        assert!(submitter.submitted.lock().is_empty());
    }

    #[test]
    fn test_invalid_hash_is_fatal() {
        let manifest = ManifestSet::from_modules(
            "s1",
            vec![Module::new("core").with_hash("xyz").with_url("https://example.com/a.jar")],
        )
        .unwrap();
        let set = select_install_set(&manifest, Side::Server, &InstanceRecord::new());

        assert!(matches!(module_tasks(&set), Err(ManagerError::InvalidHash(_))));
    }

    #[test]
    fn test_clean_removes_previous_files() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("mods")).unwrap();
        fs::write(temp.path().join("mods/old.jar"), b"old").unwrap();
        fs::write(temp.path().join("keep.txt"), b"keep").unwrap();

        let manifest = manifest();
        let set = select_install_set(&manifest, Side::Server, &InstanceRecord::new());
        let previous = vec![
            PathBuf::from("mods/old.jar"),
            PathBuf::from("mods/already-gone.jar"),
            PathBuf::from("../keep.txt"),
        ];
        let installer = QueueInstaller::new(Arc::new(RecordingSubmitter::default()));

        let mut req = request(&set, temp.path(), &previous);
        req.clean = true;
        let outcome = installer.install(req).unwrap();

        assert_eq!(outcome.removed, 1);
        assert!(!temp.path().join("mods/old.jar").exists());
        assert!(temp.path().join("keep.txt").exists());
    }

    #[test]
    fn test_without_clean_previous_files_stay() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("old.jar"), b"old").unwrap();

        let manifest = manifest();
        let set = select_install_set(&manifest, Side::Server, &InstanceRecord::new());
        let previous = vec![PathBuf::from("old.jar")];
        let installer = QueueInstaller::new(Arc::new(RecordingSubmitter::default()));

        let outcome = installer.install(request(&set, temp.path(), &previous)).unwrap();

        assert_eq!(outcome.removed, 0);
        assert!(temp.path().join("old.jar").exists());
    }

    fn assert_rejected_destination(manifest: ManifestSet, expected_module: &str) {
        let temp = TempDir::new().unwrap();
        let set = select_install_set(&manifest, Side::Server, &InstanceRecord::new());
        let submitter = Arc::new(RecordingSubmitter::default());
        let installer = QueueInstaller::new(Arc::clone(&submitter));

        let result = installer.install(request(&set, temp.path(), &[]));

        match result {
            Err(ManagerError::MissingResource { module, what }) => {
                assert_eq!(module, expected_module);
                assert!(what.contains("install directory"));
            }
            other => panic!("Expected MissingResource, got {:?}", other.map(|o| o.files)),
        }
        assert!(submitter.submitted.lock().is_empty());
    }

    #[test]
    fn test_config_path_escaping_install_dir_is_rejected() {
        let manifest = ManifestSet::from_modules(
            "s1",
            vec![Module::new("core")
                .with_url("https://example.com/core.jar")
                .with_config(
                    ConfigFile::new("../escaped.cfg", "").with_url("https://example.com/e.cfg"),
                )],
        )
        .unwrap();

        assert_rejected_destination(manifest, "../escaped.cfg");
    }

    #[test]
    fn test_absolute_module_path_is_rejected() {
        let manifest = ManifestSet::from_modules(
            "s1",
            vec![Module::new("core")
                .with_url("https://example.com/core.jar")
                .with_path("/tmp/core.jar")],
        )
        .unwrap();

        assert_rejected_destination(manifest, "core");
    }

    #[test]
    fn test_module_id_climbing_out_of_mods_is_rejected() {
        let manifest = ManifestSet::from_modules(
            "s1",
            vec![Module::new("../../outside").with_url("https://example.com/x.jar")],
        )
        .unwrap();

        assert_rejected_destination(manifest, "../../outside");
    }

    #[test]
    fn test_is_contained() {
        assert!(is_contained(Path::new("mods/a.jar")));
        assert!(is_contained(Path::new("./config/a.cfg")));
        assert!(!is_contained(Path::new("../a.jar")));
        assert!(!is_contained(Path::new("/etc/passwd")));
    }
}
