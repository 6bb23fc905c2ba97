//! Content-set fingerprinting.

use std::collections::BTreeSet;

use sha2::{Digest, Sha256};

use crate::manifest::{ManifestSet, Side};

/// Collect every distinct non-empty content hash a manifest could install on `side`.
///
/// Module hashes, their config-file hashes and their sub-module hashes all
/// contribute. Modules and sub-modules that can never apply to `side` are
/// left out; `Side::Both` covers the whole manifest. Duplicates collapse.
pub fn collect_hashes(manifest: &ManifestSet, side: Side) -> BTreeSet<&str> {
    let mut digests = BTreeSet::new();

    for module in manifest.modules().filter(|m| m.side.is_valid_for(side)) {
        if !module.content_hash.is_empty() {
            digests.insert(module.content_hash.as_str());
        }
        for config in &module.configs {
            if !config.content_hash.is_empty() {
                digests.insert(config.content_hash.as_str());
            }
        }
        for sub in module.sub_modules.iter().filter(|s| s.side.is_valid_for(side)) {
            if !sub.content_hash.is_empty() {
                digests.insert(sub.content_hash.as_str());
            }
        }
    }

    digests
}

/// Compute the fingerprint of everything a manifest could install on `side`.
///
/// The fingerprint is the lowercase hex SHA-256 of the sorted, distinct
/// content hashes, each terminated by a newline. It depends only on the set
/// of hashes, not on module order or on optional-module choices.
pub fn compute_fingerprint(manifest: &ManifestSet, side: Side) -> String {
    group_hash(collect_hashes(manifest, side))
}

/// Digest a sorted set of hashes.
pub fn group_hash<'a>(digests: impl IntoIterator<Item = &'a str>) -> String {
    let mut hasher = Sha256::new();
    for digest in digests {
        hasher.update(digest.as_bytes());
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}
