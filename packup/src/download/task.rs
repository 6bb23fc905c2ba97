//! A single file to fetch.

use std::path::PathBuf;

use super::checksum::ContentHash;

/// One file a [`DownloadQueue`](super::DownloadQueue) materializes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    /// Source URL or local path.
    pub source: String,
    /// Destination relative to the queue's base path.
    pub destination: PathBuf,
    /// Expected digest of the downloaded content, if known.
    pub expected_hash: Option<ContentHash>,
    /// Size in bytes, used only for progress weighting.
    pub size: Option<u64>,
}

impl DownloadTask {
    pub fn new(source: impl Into<String>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            expected_hash: None,
            size: None,
        }
    }

    pub fn with_hash(mut self, hash: ContentHash) -> Self {
        self.expected_hash = Some(hash);
        self
    }

    pub fn with_optional_hash(mut self, hash: Option<ContentHash>) -> Self {
        self.expected_hash = hash;
        self
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_optional_size(mut self, size: Option<u64>) -> Self {
        self.size = size;
        self
    }
}
