//! Persisted state of a previous installation.
//!
//! An [`InstanceRecord`] remembers the fingerprint of the last planned file
//! set, the user's choices for optional modules, and the files the last
//! successful run materialized. [`InstanceStore`] reads and writes it as
//! `instance.json` inside the install directory.

mod store;

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use store::{InstanceStore, INSTANCE_FILE_NAME};

/// Per-installation state carried between update runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceRecord {
    /// Fingerprint of the last planned content set.
    #[serde(default, rename = "hash")]
    pub fingerprint: String,

    /// Explicit user choices for optional modules, keyed by module id.
    ///
    /// Modules absent from this map fall back to their default-enabled flag.
    #[serde(default)]
    pub optional_mods: HashMap<String, bool>,

    /// Install-relative files written by the last successful run.
    #[serde(default)]
    pub files: Vec<PathBuf>,
}

impl InstanceRecord {
    /// Create an empty record, as used for a fresh installation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the explicit choice for an optional module, if the user made one.
    pub fn optional_choice(&self, module_id: &str) -> Option<bool> {
        self.optional_mods.get(module_id).copied()
    }

    /// Record the user's choice for an optional module.
    pub fn set_optional(&mut self, module_id: impl Into<String>, enabled: bool) {
        self.optional_mods.insert(module_id.into(), enabled);
    }

    /// Record the user's choice (builder pattern).
    pub fn with_optional(mut self, module_id: impl Into<String>, enabled: bool) -> Self {
        self.set_optional(module_id, enabled);
        self
    }
}
