//! Package install decision and execution.
//!
//! The install step is the slowest part of the pipeline, so it is gated
//! three ways: the install directory must exist, it must contain at least
//! one entry that is not package-manager scaffolding, and the hash marker
//! written after the last successful install must match the current
//! manifest dependency hash. Any gate failing (or the reconciler reporting
//! a modified manifest) triggers a real install.
//!
//! The marker is written only after a zero exit, so a failed install leaves
//! the previous marker in place and the next run retries; stale-success
//! states cannot occur.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::{
    HASH_MARKER_DIR, HASH_MARKER_FILE, IGNORED_NODE_FOLDERS, PACKAGE_LOCK_JSON, PNPM_HOOK_FILE,
};
use crate::core::AtriumError;
use crate::process::ToolCommand;
use crate::toolchain::ToolchainState;
use crate::utils::fs::{ensure_parent_dir, read_json_file, remove_dir_if_exists, write_json_file};
use crate::utils::{platform, progress};

/// pnpm hook file content, regenerated in the build dir for pnpm runs.
const PNPM_HOOK_TEMPLATE: &str = include_str!("../../assets/pnpmfile.js");

/// Contents of the hidden install marker file.
#[derive(Debug, Serialize, Deserialize)]
struct InstallMarker {
    hash: String,
}

/// Everything the install step needs to decide and act.
pub struct InstallRequest<'a> {
    /// The provisioned toolchain
    pub toolchain: &'a ToolchainState,
    /// Directory holding `package.json` and `node_modules`
    pub build_dir: PathBuf,
    /// Dependency hash of the reconciled generated manifest
    pub dependency_hash: String,
    /// Whether reconciliation changed any manifest this run
    pub manifest_modified: bool,
    /// Whether the reconciler demanded a clean reinstall
    pub force_cleanup: bool,
}

/// Path of the hash marker under a build dir.
#[must_use]
pub fn marker_path(build_dir: &Path) -> PathBuf {
    build_dir.join(HASH_MARKER_DIR).join(HASH_MARKER_FILE)
}

/// The hash recorded by the last successful install, if readable.
///
/// A corrupt marker is logged and treated as absent; the caller then
/// reinstalls, which rewrites the marker.
#[must_use]
pub fn stored_marker_hash(build_dir: &Path) -> Option<String> {
    let path = marker_path(build_dir);
    if !path.exists() {
        return None;
    }
    match read_json_file::<InstallMarker>(&path) {
        Ok(marker) => Some(marker.hash),
        Err(e) => {
            tracing::warn!(
                target: "npm",
                "Ignoring unreadable install marker {}: {}",
                path.display(),
                e
            );
            None
        }
    }
}

/// Whether `node_modules` contains at least one entry that is not
/// package-manager scaffolding.
#[must_use]
pub fn has_real_content(node_modules: &Path) -> bool {
    let Ok(entries) = fs::read_dir(node_modules) else {
        return false;
    };
    entries.filter_map(std::result::Result::ok).any(|entry| {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        !IGNORED_NODE_FOLDERS.contains(&name.as_ref())
    })
}

/// The skip predicate: `true` when an install must run.
#[must_use]
pub fn should_run_install(
    build_dir: &Path,
    dependency_hash: &str,
    manifest_modified: bool,
) -> bool {
    if manifest_modified {
        return true;
    }
    let node_modules = build_dir.join("node_modules");
    if !has_real_content(&node_modules) {
        return true;
    }
    stored_marker_hash(build_dir).as_deref() != Some(dependency_hash)
}

/// Delete the lockfile and `node_modules` ahead of a forced reinstall.
///
/// An undeletable lockfile is fatal: reinstalling against stale pins would
/// silently resurrect the dependency set the reconciler just invalidated.
pub fn force_cleanup(build_dir: &Path) -> Result<()> {
    let lockfile = build_dir.join(PACKAGE_LOCK_JSON);
    if lockfile.exists() {
        fs::remove_file(&lockfile).map_err(|_| AtriumError::LockfileDeleteFailed {
            path: lockfile.display().to_string(),
        })?;
        tracing::info!(target: "npm", "Removed stale lockfile {}", lockfile.display());
    }
    remove_dir_if_exists(&build_dir.join("node_modules"))?;
    Ok(())
}

/// Write the pnpm hook file from the bundled template.
pub fn write_pnpm_hooks(build_dir: &Path) -> Result<()> {
    if PNPM_HOOK_TEMPLATE.is_empty() {
        return Err(AtriumError::TemplateMissing { name: PNPM_HOOK_FILE.to_string() }.into());
    }
    let dest = build_dir.join(PNPM_HOOK_FILE);
    fs::write(&dest, PNPM_HOOK_TEMPLATE)
        .with_context(|| format!("Failed to write {}", dest.display()))?;
    tracing::debug!(target: "npm", "Regenerated {}", dest.display());
    Ok(())
}

/// Run the install if the gates demand it. Returns `true` when the
/// dependency tree is in a good state afterwards.
pub async fn install_if_needed(request: &InstallRequest<'_>) -> Result<bool> {
    if request.force_cleanup {
        force_cleanup(&request.build_dir)?;
    }

    if !should_run_install(
        &request.build_dir,
        &request.dependency_hash,
        request.manifest_modified,
    ) {
        tracing::info!(target: "npm", "Dependencies are up to date, skipping install");
        return Ok(true);
    }

    let use_pnpm = request.toolchain.pnpm_enabled;
    if use_pnpm {
        write_pnpm_hooks(&request.build_dir)?;
    }

    let manager = request.toolchain.package_manager().to_path_buf();
    let manager_name = if use_pnpm { "pnpm" } else { "npm" };
    tracing::info!(
        target: "npm",
        "Running {} install in {}",
        manager_name,
        request.build_dir.display()
    );

    let node_path = platform::node_path_entry(&request.toolchain.install_dir);
    let spinner = progress::spinner(format!("Running {manager_name} install"));
    let output = ToolCommand::new(&manager)
        .args(["install", "--scripts-prepend-node-path"])
        .current_dir(&request.build_dir)
        .env("ADBLOCK", "1")
        .env("NO_UPDATE_NOTIFIER", "1")
        .env("PATH", platform::prepend_to_path(&node_path))
        .with_context(format!("{manager_name} install"))
        .output()
        .await;
    spinner.finish_and_clear();
    let output = output?;

    if output.success() {
        write_marker(&request.build_dir, &request.dependency_hash)?;
        tracing::info!(target: "npm", "Install finished");
        Ok(true)
    } else {
        // Marker deliberately untouched so the next run retries
        tracing::error!(
            target: "npm",
            "{} install exited with code {}:\n{}",
            manager_name,
            output.code(),
            if output.stderr.is_empty() { &output.stdout } else { &output.stderr }
        );
        Ok(false)
    }
}

fn write_marker(build_dir: &Path, hash: &str) -> Result<()> {
    let path = marker_path(build_dir);
    ensure_parent_dir(&path)?;
    write_json_file(&path, &InstallMarker { hash: hash.to_string() })
}

#[cfg(test)]
mod tests;
