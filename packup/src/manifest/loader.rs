//! Pack retrieval and parsing.
//!
//! A pack document is a JSON file listing one or more servers, each with its
//! own module list. [`PackLoader`] fetches it over HTTP(S) or reads it from
//! disk and returns the [`ManifestSet`] for the requested server.

use std::fs;
use std::path::Path;
use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::debug;

use super::{ManifestSet, Module};
use crate::error::{ManagerError, ManagerResult};

/// Default timeout for manifest requests in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Retrieves the manifest of one server from a pack source.
pub trait ManifestLoader: Send + Sync {
    /// Load the modules of `server_id` from the pack at `source`.
    fn load(&self, source: &str, server_id: &str) -> ManagerResult<ManifestSet>;
}

/// Top-level pack document.
#[derive(Debug, Clone, Deserialize)]
pub struct PackDocument {
    #[serde(default)]
    pub servers: Vec<ServerEntry>,
}

/// One server/profile inside a pack document.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerEntry {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub modules: Vec<Module>,
}

impl PackDocument {
    /// Parse a pack document from JSON text.
    pub fn parse(source: &str, text: &str) -> ManagerResult<Self> {
        serde_json::from_str(text).map_err(|e| ManagerError::ManifestParseFailed {
            url: source.to_string(),
            reason: e.to_string(),
        })
    }

    /// Extract the manifest for one server, consuming the document.
    pub fn into_manifest(self, source: &str, server_id: &str) -> ManagerResult<ManifestSet> {
        let server = self
            .servers
            .into_iter()
            .find(|s| s.id == server_id)
            .ok_or_else(|| ManagerError::ServerNotFound {
                url: source.to_string(),
                server_id: server_id.to_string(),
            })?;

        ManifestSet::from_modules(server.id, server.modules)
    }
}

/// Loads pack documents from `http(s)://` URLs or local paths.
#[derive(Debug, Clone)]
pub struct PackLoader {
    timeout: Duration,
}

impl Default for PackLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl PackLoader {
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn fetch_text(&self, source: &str) -> ManagerResult<String> {
        if !is_remote(source) {
            let path = source.strip_prefix("file://").unwrap_or(source);
            return fs::read_to_string(path).map_err(|e| ManagerError::ReadFailed {
                path: Path::new(path).to_path_buf(),
                source: e,
            });
        }

        let fetch_err = |reason: String| ManagerError::ManifestFetchFailed {
            url: source.to_string(),
            reason,
        };

        let client = Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| fetch_err(e.to_string()))?;

        let response = client.get(source).send().map_err(|e| {
            if e.is_timeout() {
                ManagerError::Timeout {
                    url: source.to_string(),
                    timeout_secs: self.timeout.as_secs(),
                }
            } else {
                fetch_err(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(fetch_err(format!("GET request failed with status {}", status)));
        }

        response.text().map_err(|e| fetch_err(e.to_string()))
    }
}

impl ManifestLoader for PackLoader {
    fn load(&self, source: &str, server_id: &str) -> ManagerResult<ManifestSet> {
        debug!(source, server_id, "Loading pack manifest");
        let text = self.fetch_text(source)?;
        PackDocument::parse(source, &text)?.into_manifest(source, server_id)
    }
}

fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}
