//! In-memory model of a fetched modpack manifest.
//!
//! A [`ManifestSet`] holds the modules of one server/profile within a pack,
//! keyed by module id in the order the pack declared them. Modules may carry
//! one level of [`SubModule`]s and any number of [`ConfigFile`]s.
//!
//! The model is read-only once loaded; see [`loader`] for retrieval.

pub mod loader;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{ManagerError, ManagerResult};

pub use loader::{ManifestLoader, PackDocument, PackLoader};

/// Installation side a module applies to, or a run targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Client,
    Server,
    #[default]
    Both,
}

impl Side {
    /// Check whether something declared for `self` applies to `requested`.
    ///
    /// True when either side is `Both`, or both sides are equal.
    pub fn is_valid_for(self, requested: Side) -> bool {
        requested == Side::Both || self == Side::Both || self == requested
    }

    /// Get the lowercase name used on the command line and in logs.
    pub fn name(self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Server => "server",
            Self::Both => "both",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Side {
    type Err = ManagerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "client" => Ok(Self::Client),
            "server" => Ok(Self::Server),
            "both" => Ok(Self::Both),
            other => Err(ManagerError::InvalidConfig(format!(
                "unknown side '{}'",
                other
            ))),
        }
    }
}

/// A configuration file shipped with a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFile {
    /// Install-relative destination path.
    pub path: PathBuf,
    /// Download source.
    #[serde(default)]
    pub url: Option<String>,
    /// Hex content hash; empty when unknown.
    #[serde(default, alias = "md5")]
    pub content_hash: String,
}

impl ConfigFile {
    pub fn new(path: impl Into<PathBuf>, content_hash: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            url: None,
            content_hash: content_hash.into(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// A module nested under a top-level [`Module`].
///
/// Sub-modules never nest further.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubModule {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub side: Side,
    #[serde(default, alias = "md5")]
    pub content_hash: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub size: Option<u64>,
}

impl SubModule {
    pub fn new(id: impl Into<String>, side: Side, content_hash: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            side,
            content_hash: content_hash.into(),
            url: None,
            path: None,
            size: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// One top-level installable unit of a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    /// Unique key within the manifest.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Required modules are installed regardless of user choice.
    #[serde(default)]
    pub required: bool,
    /// Whether an optional module is enabled when the user never chose.
    #[serde(default, alias = "isDefault")]
    pub default_enabled: bool,
    #[serde(default)]
    pub side: Side,
    /// Hex content hash; empty means unknown and always reinstalled.
    #[serde(default, alias = "md5")]
    pub content_hash: String,
    #[serde(default)]
    pub url: Option<String>,
    /// Install-relative destination, `mods/<id>.jar` when absent.
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default, alias = "submodules")]
    pub sub_modules: Vec<SubModule>,
    #[serde(default)]
    pub configs: Vec<ConfigFile>,
}

impl Module {
    /// Create an optional, disabled-by-default module applying to both sides.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            required: false,
            default_enabled: false,
            side: Side::Both,
            content_hash: String::new(),
            url: None,
            path: None,
            size: None,
            sub_modules: Vec::new(),
            configs: Vec::new(),
        }
    }

    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn with_default_enabled(mut self, enabled: bool) -> Self {
        self.default_enabled = enabled;
        self
    }

    pub fn with_side(mut self, side: Side) -> Self {
        self.side = side;
        self
    }

    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        self.content_hash = hash.into();
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_sub_module(mut self, sub: SubModule) -> Self {
        self.sub_modules.push(sub);
        self
    }

    pub fn with_config(mut self, config: ConfigFile) -> Self {
        self.configs.push(config);
        self
    }
}

/// Default destination for a module without an explicit path.
pub(crate) fn default_module_path(id: &str) -> PathBuf {
    Path::new("mods").join(format!("{}.jar", id))
}

/// The modules of one server/profile, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManifestSet {
    server_id: String,
    modules: IndexMap<String, Module>,
}

impl ManifestSet {
    /// Build a manifest from modules in declaration order.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::DuplicateModule`] if two modules share an id.
    pub fn from_modules(
        server_id: impl Into<String>,
        modules: impl IntoIterator<Item = Module>,
    ) -> ManagerResult<Self> {
        let mut map = IndexMap::new();
        for module in modules {
            if map.contains_key(&module.id) {
                return Err(ManagerError::DuplicateModule(module.id));
            }
            map.insert(module.id.clone(), module);
        }
        Ok(Self {
            server_id: server_id.into(),
            modules: map,
        })
    }

    pub fn server_id(&self) -> &str {
        &self.server_id
    }

    /// Iterate over modules in declaration order.
    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.modules.values()
    }

    pub fn get(&self, id: &str) -> Option<&Module> {
        self.modules.get(id)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}
