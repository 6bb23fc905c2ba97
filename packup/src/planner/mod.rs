//! Update planning: fingerprinting and install-set selection.
//!
//! Planning is pure and synchronous. Given a [`ManifestSet`], the side being
//! installed and the previous [`InstanceRecord`], it produces:
//! - the fingerprint of the content set (`fingerprint`)
//! - the ordered list of modules and config files to install (`selection`)

mod fingerprint;
mod selection;

pub use fingerprint::{collect_hashes, compute_fingerprint, group_hash};
pub use selection::{
    resolve_optional, select_install_set, InstallSet, OptionalChoice, SelectedModule,
};

use crate::instance::InstanceRecord;
use crate::manifest::{ManifestSet, Side};

/// Result of planning one update run.
#[derive(Debug, Clone)]
pub struct UpdatePlan<'a> {
    /// What to install, in manifest order.
    pub install_set: InstallSet<'a>,
    /// The prior record with its fingerprint replaced.
    pub record: InstanceRecord,
    /// Whether the fingerprint differs from the prior record's.
    pub fingerprint_changed: bool,
}

/// Plan an update run.
///
/// Selection uses the prior record's optional-module choices; the returned
/// record carries the new fingerprint and is otherwise unchanged.
pub fn plan(manifest: &ManifestSet, side: Side, mut record: InstanceRecord) -> UpdatePlan<'_> {
    let fingerprint = compute_fingerprint(manifest, side);
    let install_set = select_install_set(manifest, side, &record);
    let fingerprint_changed = record.fingerprint != fingerprint;
    record.fingerprint = fingerprint;

    UpdatePlan {
        install_set,
        record,
        fingerprint_changed,
    }
}
