//! Package manifest documents and their reconciliation.
//!
//! Two `package.json` instances live side by side during a run: the *main*
//! manifest (user-owned, persisted across runs, in the build dir) and the
//! *generated* manifest (build-owned, recreated each run and merged with the
//! main one). [`ManifestDocument`] wraps both as ordered-key JSON objects;
//! key order is preserved across load/merge/save so user-authored files do
//! not churn in version control.
//!
//! Submodules:
//! - [`merge`] - the five-kind deep merge used to fold main into generated
//! - [`hash`] - the dependency hash that gates package-manager installs
//! - [`reconcile`] - required-package reconciliation, stale-dependency
//!   pruning, and shrinkwrap pin-change detection

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::path::Path;

use crate::constants::{DEFAULT_DEPENDENCIES, DEFAULT_DEV_DEPENDENCIES};
use crate::core::AtriumError;
use crate::utils::fs::{ensure_parent_dir, read_text_file};

pub mod hash;
pub mod merge;
pub mod reconcile;

#[cfg(test)]
mod tests;

/// Key of the runtime dependencies object.
pub const DEPENDENCIES: &str = "dependencies";

/// Key of the development dependencies object.
pub const DEV_DEPENDENCIES: &str = "devDependencies";

/// An ordered-key package manifest.
///
/// Wraps a `serde_json` object map; with the `preserve_order` feature the
/// map keeps insertion order, which makes saved manifests stable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManifestDocument {
    root: Map<String, Value>,
}

impl ManifestDocument {
    /// An empty manifest.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a manifest from disk. A missing file yields an empty document;
    /// an unparsable or non-object file is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let content = read_text_file(path)?;
        let value: Value =
            serde_json::from_str(&content).map_err(|e| AtriumError::ManifestParseError {
                file: path.display().to_string(),
                reason: e.to_string(),
            })?;
        match value {
            Value::Object(root) => Ok(Self { root }),
            other => Err(AtriumError::ManifestParseError {
                file: path.display().to_string(),
                reason: format!("expected a JSON object, found {}", kind_name(&other)),
            }
            .into()),
        }
    }

    /// Write the manifest as pretty-printed JSON, creating parent
    /// directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        ensure_parent_dir(path)?;
        let content = serde_json::to_string_pretty(&Value::Object(self.root.clone()))?;
        std::fs::write(path, content + "\n")
            .with_context(|| format!("Failed to write manifest: {}", path.display()))
    }

    /// Borrow the underlying object map.
    #[must_use]
    pub fn root(&self) -> &Map<String, Value> {
        &self.root
    }

    /// Mutably borrow the underlying object map.
    pub fn root_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.root
    }

    /// Look up a top-level string value.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.root.get(key).and_then(Value::as_str)
    }

    /// Insert a top-level value unconditionally.
    pub fn set(&mut self, key: &str, value: Value) {
        self.root.insert(key.to_string(), value);
    }

    /// Insert a value only if the key is absent. Returns `true` when the
    /// insertion happened.
    pub fn set_if_absent(&mut self, key: &str, value: Value) -> bool {
        if self.root.contains_key(key) {
            return false;
        }
        self.root.insert(key.to_string(), value);
        true
    }

    /// Borrow a named sub-object, if present and an object.
    #[must_use]
    pub fn object(&self, key: &str) -> Option<&Map<String, Value>> {
        self.root.get(key).and_then(Value::as_object)
    }

    /// Borrow a named sub-object mutably, creating an empty one if the key
    /// is absent or not an object.
    pub fn object_mut(&mut self, key: &str) -> &mut Map<String, Value> {
        let needs_reset = !matches!(self.root.get(key), Some(Value::Object(_)));
        if needs_reset {
            self.root.insert(key.to_string(), Value::Object(Map::new()));
        }
        match self.root.get_mut(key) {
            Some(Value::Object(map)) => map,
            _ => unreachable!("object slot was just initialized"),
        }
    }

    /// Set a dependency entry in the named section. Returns `true` when the
    /// entry was added or its version changed.
    pub fn set_dependency(&mut self, section: &str, name: &str, version: &str) -> bool {
        let deps = self.object_mut(section);
        match deps.get(name) {
            Some(Value::String(existing)) if existing == version => false,
            _ => {
                deps.insert(name.to_string(), Value::String(version.to_string()));
                true
            }
        }
    }

    /// Version of a dependency in the named section, if present.
    #[must_use]
    pub fn dependency_version(&self, section: &str, name: &str) -> Option<&str> {
        self.object(section)?.get(name)?.as_str()
    }

    /// Apply the default key insertions a framework project expects.
    ///
    /// Inserts `name`, `license`, the `private` flag, and the default
    /// runtime/bundler dependencies. Everything is absent-only except the
    /// boolean flag, which is re-asserted when `overwrite_flags` is set.
    /// Returns the number of insertions performed; a non-zero count means
    /// the document changed.
    pub fn ensure_defaults(&mut self, overwrite_flags: bool) -> usize {
        let mut modified = 0;

        if self.set_if_absent("name", Value::String("no-name".to_string())) {
            modified += 1;
        }
        if self.set_if_absent("license", Value::String("UNLICENSED".to_string())) {
            modified += 1;
        }
        let private_changed = if overwrite_flags {
            let stale = self.root.get("private") != Some(&Value::Bool(true));
            if stale {
                self.set("private", Value::Bool(true));
            }
            stale
        } else {
            self.set_if_absent("private", Value::Bool(true))
        };
        if private_changed {
            modified += 1;
        }
        for (name, version) in DEFAULT_DEPENDENCIES {
            if self.dependency_version(DEPENDENCIES, name).is_none() {
                self.set_dependency(DEPENDENCIES, name, version);
                modified += 1;
            }
        }
        for (name, version) in DEFAULT_DEV_DEPENDENCIES {
            if self.dependency_version(DEV_DEPENDENCIES, name).is_none() {
                self.set_dependency(DEV_DEPENDENCIES, name, version);
                modified += 1;
            }
        }

        modified
    }
}

pub(crate) fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
