//! Install-set selection for a side and prior user choices.

use std::path::PathBuf;

use crate::instance::InstanceRecord;
use crate::manifest::{default_module_path, ConfigFile, ManifestSet, Module, Side, SubModule};

/// Outcome of resolving an optional module against the instance record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionalChoice {
    /// The user explicitly enabled the module.
    ExplicitOn,
    /// The user explicitly disabled the module.
    ExplicitOff,
    /// The user never chose; the module's default-enabled flag applies.
    Default(bool),
}

impl OptionalChoice {
    pub fn is_enabled(self) -> bool {
        match self {
            Self::ExplicitOn => true,
            Self::ExplicitOff => false,
            Self::Default(enabled) => enabled,
        }
    }
}

/// Resolve an optional module: an explicit record entry wins over the default.
pub fn resolve_optional(
    record: &InstanceRecord,
    module_id: &str,
    default_enabled: bool,
) -> OptionalChoice {
    match record.optional_choice(module_id) {
        Some(true) => OptionalChoice::ExplicitOn,
        Some(false) => OptionalChoice::ExplicitOff,
        None => OptionalChoice::Default(default_enabled),
    }
}

/// A module or sub-module chosen for installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectedModule<'a> {
    Module(&'a Module),
    SubModule {
        parent: &'a Module,
        sub: &'a SubModule,
    },
}

impl<'a> SelectedModule<'a> {
    pub fn id(&self) -> &'a str {
        match self {
            Self::Module(m) => &m.id,
            Self::SubModule { sub, .. } => &sub.id,
        }
    }

    /// Id of the owning top-level module.
    pub fn parent_id(&self) -> Option<&'a str> {
        match self {
            Self::Module(_) => None,
            Self::SubModule { parent, .. } => Some(&parent.id),
        }
    }

    pub fn content_hash(&self) -> &'a str {
        match self {
            Self::Module(m) => &m.content_hash,
            Self::SubModule { sub, .. } => &sub.content_hash,
        }
    }

    pub fn url(&self) -> Option<&'a str> {
        match self {
            Self::Module(m) => m.url.as_deref(),
            Self::SubModule { sub, .. } => sub.url.as_deref(),
        }
    }

    pub fn size(&self) -> Option<u64> {
        match self {
            Self::Module(m) => m.size,
            Self::SubModule { sub, .. } => sub.size,
        }
    }

    /// Install-relative destination path.
    pub fn install_path(&self) -> PathBuf {
        let explicit = match self {
            Self::Module(m) => m.path.as_ref(),
            Self::SubModule { sub, .. } => sub.path.as_ref(),
        };
        explicit
            .cloned()
            .unwrap_or_else(|| default_module_path(self.id()))
    }
}

/// Modules and config files selected for one update run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallSet<'a> {
    pub modules: Vec<SelectedModule<'a>>,
    pub configs: Vec<&'a ConfigFile>,
}

impl InstallSet<'_> {
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty() && self.configs.is_empty()
    }

    /// Ids of the selected modules, in selection order.
    pub fn module_ids(&self) -> Vec<&str> {
        self.modules.iter().map(|m| m.id()).collect()
    }
}

/// Decide whether a side-valid top-level module is installed.
fn is_included(module: &Module, side: Side, record: &InstanceRecord) -> bool {
    side == Side::Server
        || module.required
        || resolve_optional(record, &module.id, module.default_enabled).is_enabled()
}

/// Select the modules and config files to install for `side`.
///
/// Modules are visited in manifest order. A module is skipped unless it is
/// valid for `side`. Server runs take every valid module; client runs take
/// required modules and optional modules resolved by [`resolve_optional`].
/// An included module is followed by its side-valid sub-modules, and all of
/// its config files are appended without side filtering.
pub fn select_install_set<'a>(
    manifest: &'a ManifestSet,
    side: Side,
    record: &InstanceRecord,
) -> InstallSet<'a> {
    let mut set = InstallSet::default();

    for module in manifest.modules() {
        if !module.side.is_valid_for(side) || !is_included(module, side, record) {
            continue;
        }

        set.modules.push(SelectedModule::Module(module));
        set.modules.extend(
            module
                .sub_modules
                .iter()
                .filter(|sub| sub.side.is_valid_for(side))
                .map(|sub| SelectedModule::SubModule {
                    parent: module,
                    sub,
                }),
        );
        set.configs.extend(module.configs.iter());
    }

    set
}
