//! Dependency hashing for install gating.
//!
//! The install step is skipped when nothing about the dependency set
//! changed. "Nothing changed" is decided by a SHA-256 digest over the
//! dependencies section: each entry is rendered as a `"name": "version"`
//! pair string, the pair strings are sorted in descending lexicographic
//! order (making the digest independent of document key order), joined with
//! `". \n "`, and hashed. The digest is stored both under
//! [`PACKAGE_HASH_KEY`] in the main manifest and in the hidden install
//! marker file that the installer writes after a successful install.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use super::{DEPENDENCIES, ManifestDocument};
use crate::constants::PACKAGE_HASH_KEY;

/// Compute the hex digest over a dependencies object.
#[must_use]
pub fn dependency_hash(dependencies: &Map<String, Value>) -> String {
    let mut pairs: Vec<String> = dependencies
        .iter()
        .map(|(name, version)| {
            let version = version.as_str().unwrap_or_default();
            format!("\"{name}\": \"{version}\"")
        })
        .collect();
    pairs.sort_by(|a, b| b.cmp(a));

    let mut hasher = Sha256::new();
    hasher.update(pairs.join(". \n ").as_bytes());
    hex::encode(hasher.finalize())
}

impl ManifestDocument {
    /// Digest of this document's dependencies section. An absent section
    /// hashes as an empty set.
    #[must_use]
    pub fn dependencies_hash(&self) -> String {
        static EMPTY: std::sync::OnceLock<Map<String, Value>> = std::sync::OnceLock::new();
        let empty = EMPTY.get_or_init(Map::new);
        dependency_hash(self.object(DEPENDENCIES).unwrap_or(empty))
    }

    /// The digest stored by a previous run, if any.
    #[must_use]
    pub fn stored_hash(&self) -> Option<&str> {
        self.get_str(PACKAGE_HASH_KEY)
    }

    /// Store `hash` under the well-known key. Returns `true` when the
    /// stored value was absent or different, i.e. the document changed.
    pub fn update_stored_hash(&mut self, hash: &str) -> bool {
        if self.stored_hash() == Some(hash) {
            return false;
        }
        self.set(PACKAGE_HASH_KEY, Value::String(hash.to_string()));
        true
    }
}
