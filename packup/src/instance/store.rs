//! Loading and saving `instance.json`.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::InstanceRecord;
use crate::error::{ManagerError, ManagerResult};

/// File name of the instance record inside an install directory.
pub const INSTANCE_FILE_NAME: &str = "instance.json";

/// Reads and writes the instance record of one install directory.
#[derive(Debug, Clone)]
pub struct InstanceStore {
    path: PathBuf,
}

impl InstanceStore {
    /// Create a store for the record inside `install_path`.
    pub fn new(install_path: impl AsRef<Path>) -> Self {
        Self {
            path: install_path.as_ref().join(INSTANCE_FILE_NAME),
        }
    }

    /// Path of the record file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the record, substituting an empty one if it is missing or corrupt.
    pub fn load(&self) -> InstanceRecord {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "No instance record, starting fresh");
                return InstanceRecord::new();
            }
        };

        match serde_json::from_str(&text) {
            Ok(record) => record,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Instance record is corrupt, starting fresh");
                InstanceRecord::new()
            }
        }
    }

    /// Write the record, replacing any previous one.
    ///
    /// The record is written to a sibling temporary file and renamed into
    /// place so a crash never leaves a truncated record behind.
    pub fn save(&self, record: &InstanceRecord) -> ManagerResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| ManagerError::CreateDirFailed {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let json = serde_json::to_string_pretty(record)
            .map_err(|e| ManagerError::InvalidConfig(e.to_string()))?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| ManagerError::WriteFailed {
            path: tmp.clone(),
            source: e,
        })?;
        fs::rename(&tmp, &self.path).map_err(|e| ManagerError::WriteFailed {
            path: self.path.clone(),
            source: e,
        })?;

        debug!(path = %self.path.display(), "Instance record saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_yields_empty() {
        let temp = TempDir::new().unwrap();
        let store = InstanceStore::new(temp.path());

        assert_eq!(store.load(), InstanceRecord::new());
    }

    #[test]
    fn test_load_corrupt_yields_empty() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(INSTANCE_FILE_NAME), "{ broken").unwrap();

        let store = InstanceStore::new(temp.path());
        assert_eq!(store.load(), InstanceRecord::new());
    }

    #[test]
    fn test_save_then_load() {
        let temp = TempDir::new().unwrap();
        let store = InstanceStore::new(temp.path().join("nested"));

        let mut record = InstanceRecord::new().with_optional("minimap", false);
        record.fingerprint = "f00d".to_string();
        record.files.push(PathBuf::from("mods/core.jar"));

        store.save(&record).unwrap();
        assert_eq!(store.load(), record);
        assert!(!store.path().with_extension("json.tmp").exists());
    }
}
