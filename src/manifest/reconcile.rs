//! Reconciliation of the generated manifest against the scanned
//! required-package set.
//!
//! The frontend-import scanner (an external collaborator; its output is
//! passed in as a name→version map) decides which npm packages the
//! application's frontend actually needs. Reconciliation brings the
//! generated manifest in line with that map: missing or version-changed
//! entries are added, and dependency keys absent from the map are pruned as
//! stale.
//!
//! One dependency is special: the shrinkwrap pin. A version change of that
//! package means the framework's whole pinned dependency set moved, and the
//! only safe response is a clean reinstall (delete lockfile and
//! node_modules). The pin's previous version is looked up through four
//! fallback sources in priority order, because any given run may find some
//! of them missing:
//! 1. the main manifest's dependencies,
//! 2. the generated manifest's dependencies (as loaded from the prior run),
//! 3. the installed package's own manifest under `node_modules`,
//! 4. the package-manager lockfile.

use anyhow::Result;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

use super::{DEPENDENCIES, ManifestDocument};
use crate::constants::{PACKAGE_JSON, PACKAGE_LOCK_JSON, SHRINKWRAP_PACKAGE};
use crate::utils::fs::read_json_file;

/// Result of reconciling the generated manifest.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReconcileOutcome {
    /// Whether the generated document changed and must be re-persisted.
    pub modified: bool,
    /// Whether the shrinkwrap pin moved and a clean reinstall is required.
    pub do_cleanup: bool,
}

/// Load a required-packages map from a JSON object file
/// (`{"@scope/pkg": "1.2.3", ...}`).
pub fn load_required_packages(path: &Path) -> Result<BTreeMap<String, String>> {
    read_json_file(path)
}

/// Bring `generated` in line with the scanned `required` map.
///
/// `main` and `build_dir` feed the pin-version fallback chain; both are
/// read, never written. The pin lookup runs before any mutation so the
/// "previous" version is not shadowed by the incoming one.
pub fn reconcile_required_packages(
    generated: &mut ManifestDocument,
    required: &BTreeMap<String, String>,
    main: &ManifestDocument,
    build_dir: &Path,
) -> ReconcileOutcome {
    let previous_pin = pinned_version_before(main, generated, build_dir);

    let mut modified = false;
    for (name, version) in required {
        if generated.set_dependency(DEPENDENCIES, name, version) {
            tracing::debug!(target: "manifest", "Dependency updated: {} {}", name, version);
            modified = true;
        }
    }

    // Stale-dependency cleanup: anything the scanner no longer reports
    // is dropped from the generated manifest.
    let stale: Vec<String> = generated
        .object(DEPENDENCIES)
        .map(|deps| {
            deps.keys().filter(|key| !required.contains_key(*key)).cloned().collect()
        })
        .unwrap_or_default();
    for name in stale {
        tracing::debug!(target: "manifest", "Removing stale dependency: {}", name);
        generated.object_mut(DEPENDENCIES).remove(&name);
        modified = true;
    }

    let current_pin = required.get(SHRINKWRAP_PACKAGE).map(String::as_str);
    let do_cleanup = match (&previous_pin, current_pin) {
        (Some(previous), current) => current != Some(previous.as_str()),
        (None, _) => false,
    };
    if do_cleanup {
        tracing::info!(
            target: "manifest",
            "Pinned dependency set changed ({} -> {}), full reinstall required",
            previous_pin.as_deref().unwrap_or("none"),
            current_pin.unwrap_or("none")
        );
    }

    ReconcileOutcome { modified, do_cleanup }
}

/// The shrinkwrap pin's version before this run, resolved through the
/// fallback chain.
#[must_use]
pub fn pinned_version_before(
    main: &ManifestDocument,
    generated: &ManifestDocument,
    build_dir: &Path,
) -> Option<String> {
    main.dependency_version(DEPENDENCIES, SHRINKWRAP_PACKAGE)
        .or_else(|| generated.dependency_version(DEPENDENCIES, SHRINKWRAP_PACKAGE))
        .map(ToString::to_string)
        .or_else(|| installed_package_version(build_dir))
        .or_else(|| lockfile_pinned_version(build_dir))
}

/// Version reported by the installed package's own manifest, if present.
fn installed_package_version(build_dir: &Path) -> Option<String> {
    let manifest_path =
        build_dir.join("node_modules").join(SHRINKWRAP_PACKAGE).join(PACKAGE_JSON);
    let value: Value = read_json_file(&manifest_path).ok()?;
    value.get("version")?.as_str().map(ToString::to_string)
}

/// Version pinned in the package-manager lockfile, if present.
///
/// Handles both lockfile generations: the `packages` table keyed by
/// `node_modules/<name>` and the older flat `dependencies` table.
fn lockfile_pinned_version(build_dir: &Path) -> Option<String> {
    let lock_path = build_dir.join(PACKAGE_LOCK_JSON);
    let value: Value = read_json_file(&lock_path).ok()?;

    let from_packages = value
        .get("packages")
        .and_then(|packages| packages.get(format!("node_modules/{SHRINKWRAP_PACKAGE}")))
        .and_then(|entry| entry.get("version"))
        .and_then(Value::as_str);
    if let Some(version) = from_packages {
        return Some(version.to_string());
    }

    value
        .get("dependencies")
        .and_then(|deps| deps.get(SHRINKWRAP_PACKAGE))
        .and_then(|entry| entry.get("version"))
        .and_then(Value::as_str)
        .map(ToString::to_string)
}
