//! pnpm bootstrap via a throwaway npm project.
//!
//! pnpm is installed with npm itself, into the toolchain root rather than
//! the user's project. npm insists on a manifest in its working directory
//! and will otherwise walk up and mutate whatever `package.json` it finds
//! first, so any real manifest/lockfile already sitting in the toolchain
//! root is swapped aside, a throwaway manifest is written, and the swapped
//! files are restored by a drop guard on every exit path.
//!
//! Failure posture: an install that exits non-zero degrades the run (the
//! caller falls back to npm); an install that "succeeds" but then reports
//! the wrong version from `npm list` is fatal, because local state is now
//! inconsistent in a way a retry will not fix.

use anyhow::{Context, Result};
use regex::Regex;
use semver::Version;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::AtriumError;
use crate::process::ToolCommand;
use crate::utils::platform;

/// Restores swapped-aside files when dropped.
struct SwapGuard {
    // (parked location, original location)
    parked: Vec<(PathBuf, PathBuf)>,
}

impl SwapGuard {
    fn park(root: &Path, names: &[&str]) -> Result<Self> {
        let mut parked = Vec::new();
        for name in names {
            let original = root.join(name);
            if original.exists() {
                let swap = root.join(format!("{name}.swap"));
                fs::rename(&original, &swap).with_context(|| {
                    format!("Failed to swap aside {}", original.display())
                })?;
                parked.push((swap, original));
            }
        }
        Ok(Self { parked })
    }
}

impl Drop for SwapGuard {
    fn drop(&mut self) {
        for (swap, original) in self.parked.drain(..) {
            // Remove anything the bootstrap left at the original path first
            if original.exists() {
                let _ = fs::remove_file(&original);
            }
            if let Err(e) = fs::rename(&swap, &original) {
                tracing::warn!(
                    target: "toolchain",
                    "Could not restore {}: {}",
                    original.display(),
                    e
                );
            }
        }
    }
}

/// Install the pinned pnpm version into `toolchain_root` using `npm_binary`,
/// then validate what actually got installed.
pub async fn bootstrap_pnpm(
    npm_binary: &Path,
    toolchain_root: &Path,
    version: &str,
) -> Result<Version> {
    tracing::info!(target: "toolchain", "Installing pnpm {} into {}", version, toolchain_root.display());

    let install_result = {
        let _guard = SwapGuard::park(toolchain_root, &["package.json", "package-lock.json"])?;

        fs::write(
            toolchain_root.join("package.json"),
            "{\"name\": \"toolchain-bootstrap\", \"version\": \"0.0.0\", \"license\": \"UNLICENSED\"}\n",
        )
        .with_context(|| {
            format!("Failed to write bootstrap manifest in {}", toolchain_root.display())
        })?;

        let result = ToolCommand::new(npm_binary)
            .arg("install")
            .arg(format!("pnpm@{version}"))
            .current_dir(toolchain_root)
            .env("ADBLOCK", "1")
            .env("NO_UPDATE_NOTIFIER", "1")
            .with_context("npm install pnpm")
            .output()
            .await;

        // The bootstrap manifest is ours to clean up before the guard
        // restores the real one
        let _ = fs::remove_file(toolchain_root.join("package.json"));
        result
    };

    let output = install_result?;
    if !output.success() {
        return Err(AtriumError::PnpmInstallFailed {
            version: version.to_string(),
            reason: if output.stderr.is_empty() { output.stdout } else { output.stderr },
        }
        .into());
    }

    validate_pnpm_install(npm_binary, toolchain_root, version).await
}

/// Parse `npm list pnpm --depth=0` output for the expected `pnpm@<version>`
/// token.
async fn validate_pnpm_install(
    npm_binary: &Path,
    toolchain_root: &Path,
    version: &str,
) -> Result<Version> {
    let output = ToolCommand::new(npm_binary)
        .args(["list", "pnpm", "--depth=0"])
        .current_dir(toolchain_root)
        .env("NO_UPDATE_NOTIFIER", "1")
        .with_context("npm list pnpm")
        .output()
        .await?;

    match installed_pnpm_version(&output.stdout) {
        Some(found) if found.to_string() == version => {
            tracing::info!(target: "toolchain", "pnpm {} installed and validated", found);
            Ok(found)
        }
        _ => Err(AtriumError::PnpmVersionMismatch {
            expected: version.to_string(),
            output: output.stdout,
        }
        .into()),
    }
}

/// Extract the installed pnpm version from `npm list` output.
#[must_use]
pub fn installed_pnpm_version(list_output: &str) -> Option<Version> {
    // Match the "pnpm@x.y.z" token anywhere in the tree output
    let re = Regex::new(r"pnpm@(\d+\.\d+\.\d+)").ok()?;
    let captures = re.captures(list_output)?;
    Version::parse(captures.get(1)?.as_str()).ok()
}

/// Whether a working pnpm of the pinned version is already present in the
/// toolchain root.
pub async fn pnpm_satisfied(toolchain_root: &Path, version: &str) -> bool {
    let launcher = platform::pnpm_executable(toolchain_root);
    if !launcher.exists() {
        return false;
    }
    match super::probe::probe_version(&launcher, true).await {
        Ok(found) => found.to_string() == version,
        Err(_) => false,
    }
}
