//! Error types for update planning, downloading and installation.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for manager operations.
pub type ManagerResult<T> = Result<T, ManagerError>;

/// Errors that can occur while updating a modpack installation.
#[derive(Debug, Error)]
pub enum ManagerError {
    /// Failed to read a file or directory.
    #[error("failed to read {}: {source}", path.display())]
    ReadFailed { path: PathBuf, source: io::Error },

    /// Failed to write a file or directory.
    #[error("failed to write {}: {source}", path.display())]
    WriteFailed { path: PathBuf, source: io::Error },

    /// Failed to create a directory.
    #[error("failed to create directory {}: {source}", path.display())]
    CreateDirFailed { path: PathBuf, source: io::Error },

    /// Failed to retrieve the pack manifest.
    #[error("failed to fetch manifest from {url}: {reason}")]
    ManifestFetchFailed { url: String, reason: String },

    /// Failed to parse the pack manifest.
    #[error("failed to parse manifest from {url}: {reason}")]
    ManifestParseFailed { url: String, reason: String },

    /// The requested server is not described by the pack.
    #[error("server '{server_id}' not found in pack {url}")]
    ServerNotFound { url: String, server_id: String },

    /// Two modules share an id within one manifest.
    #[error("duplicate module id '{0}' in manifest")]
    DuplicateModule(String),

    /// A single file transfer failed.
    #[error("failed to download {url}: {reason}")]
    DownloadFailed { url: String, reason: String },

    /// Network timeout.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },

    /// Content hash verification failed.
    #[error("checksum mismatch for {filename}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        filename: String,
        expected: String,
        actual: String,
    },

    /// A content hash string is not a recognised digest.
    #[error("invalid content hash '{0}'")]
    InvalidHash(String),

    /// A selected module or config lacks something needed to install it.
    #[error("module '{module}' is missing {what}")]
    MissingResource { module: String, what: String },

    /// One or more download queues finished in the failed state.
    #[error("{} download queue(s) failed: {}", queues.len(), queues.join("; "))]
    QueuesFailed { queues: Vec<String> },

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_resource_display() {
        let err = ManagerError::MissingResource {
            module: "jei".to_string(),
            what: "a download URL".to_string(),
        };
        assert_eq!(err.to_string(), "module 'jei' is missing a download URL");
    }

    #[test]
    fn test_checksum_mismatch_display() {
        let err = ManagerError::ChecksumMismatch {
            filename: "jei.jar".to_string(),
            expected: "abc123".to_string(),
            actual: "def456".to_string(),
        };
        assert!(err.to_string().contains("checksum mismatch"));
        assert!(err.to_string().contains("abc123"));
        assert!(err.to_string().contains("def456"));
    }

    #[test]
    fn test_queues_failed_lists_every_queue() {
        let err = ManagerError::QueuesFailed {
            queues: vec!["main mods".to_string(), "main configs".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.starts_with("2 download queue(s) failed"));
        assert!(msg.contains("main mods"));
        assert!(msg.contains("main configs"));
    }
}
