//! File transfer for download tasks.
//!
//! [`Fetcher`] is the single-file transfer seam used by download queues.
//! [`HttpFetcher`] streams `http(s)://` sources with a blocking client and
//! copies local (`file://` or plain path) sources, reporting bytes written
//! as it goes. Content verification is the queue's job, not the fetcher's.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::blocking::Client;

use crate::error::{ManagerError, ManagerResult};

/// Default timeout for HTTP requests in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300; // 5 minutes

/// Buffer size for reading/writing during downloads (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// Transfers one source to one destination file.
pub trait Fetcher: Send + Sync {
    /// Write the content of `source` to `dest`, replacing any existing file.
    ///
    /// `on_progress` receives the running byte count. Returns the total
    /// number of bytes written.
    fn fetch(&self, source: &str, dest: &Path, on_progress: &dyn Fn(u64)) -> ManagerResult<u64>;
}

/// HTTP-based fetcher with local-file fallback.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpFetcher {
    /// Create a fetcher with the default timeout.
    pub fn new() -> ManagerResult<Self> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a fetcher with a custom timeout.
    pub fn with_timeout(timeout: Duration) -> ManagerResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ManagerError::InvalidConfig(format!("HTTP client: {}", e)))?;

        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn fetch_remote(&self, url: &str, dest: &Path, on_progress: &dyn Fn(u64)) -> ManagerResult<u64> {
        let response = self.client.get(url).send().map_err(|e| {
            if e.is_timeout() {
                ManagerError::Timeout {
                    url: url.to_string(),
                    timeout_secs: self.timeout.as_secs(),
                }
            } else {
                ManagerError::DownloadFailed {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ManagerError::DownloadFailed {
                url: url.to_string(),
                reason: format!("GET request failed with status {}", status),
            });
        }

        stream_to_file(url, response, dest, on_progress)
    }

    fn fetch_local(&self, source: &str, dest: &Path, on_progress: &dyn Fn(u64)) -> ManagerResult<u64> {
        let path = Path::new(source.strip_prefix("file://").unwrap_or(source));
        let file = File::open(path).map_err(|e| ManagerError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
        stream_to_file(source, file, dest, on_progress)
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, source: &str, dest: &Path, on_progress: &dyn Fn(u64)) -> ManagerResult<u64> {
        if source.starts_with("http://") || source.starts_with("https://") {
            self.fetch_remote(source, dest, on_progress)
        } else {
            self.fetch_local(source, dest, on_progress)
        }
    }
}

/// Copy a reader into `dest`, creating parent directories as needed.
///
/// Bytes go to a `.part` sibling that replaces `dest` only once the copy
/// completed, so a failed transfer leaves any existing file untouched.
fn stream_to_file(
    source: &str,
    reader: impl Read,
    dest: &Path,
    on_progress: &dyn Fn(u64),
) -> ManagerResult<u64> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|e| ManagerError::CreateDirFailed {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let partial = partial_path(dest);
    let result = copy_to(source, reader, &partial, on_progress).and_then(|downloaded| {
        fs::rename(&partial, dest).map_err(|e| ManagerError::WriteFailed {
            path: dest.to_path_buf(),
            source: e,
        })?;
        Ok(downloaded)
    });

    if result.is_err() {
        let _ = fs::remove_file(&partial);
    }
    result
}

/// `<dest>.part` in the same directory as `dest`.
fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().map(OsString::from).unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}

fn copy_to(
    source: &str,
    mut reader: impl Read,
    path: &Path,
    on_progress: &dyn Fn(u64),
) -> ManagerResult<u64> {
    let file = File::create(path).map_err(|e| ManagerError::WriteFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut writer = BufWriter::new(file);
    let mut buffer = vec![0u8; BUFFER_SIZE];
    let mut downloaded = 0u64;

    loop {
        let bytes_read = reader
            .read(&mut buffer)
            .map_err(|e| ManagerError::DownloadFailed {
                url: source.to_string(),
                reason: format!("Read error: {}", e),
            })?;

        if bytes_read == 0 {
            break;
        }

        writer
            .write_all(&buffer[..bytes_read])
            .map_err(|e| ManagerError::WriteFailed {
                path: path.to_path_buf(),
                source: e,
            })?;

        downloaded += bytes_read as u64;
        on_progress(downloaded);
    }

    writer.flush().map_err(|e| ManagerError::WriteFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    Ok(downloaded)
}
