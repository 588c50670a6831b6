//! Toolchain provisioning: a pinned Node.js runtime plus an optional pnpm.
//!
//! [`ensure_toolchain`] is idempotent. An install directory whose binaries
//! already report satisfactory versions is left untouched (log-only); only
//! a missing, stale, or broken install triggers the download/unpack cycle.
//! If a fresh install still fails validation the run aborts with
//! [`AtriumError::ToolchainCorrupt`]; there is no retry loop to hide a
//! mirror serving bad archives.
//!
//! pnpm is optional and degrading: when its bootstrap fails, the run
//! continues on npm with a prominent warning. The one exception is a
//! post-install version mismatch, which is fatal (see [`pnpm`]).

use anyhow::Result;
use semver::Version;
use std::path::{Path, PathBuf};

use crate::constants::{
    NODE_INSTALL_DIR, SUPPORTED_NODE_VERSION, SUPPORTED_NPM_VERSION,
};
use crate::core::AtriumError;
use crate::utils::fs::ensure_dir;
use crate::utils::platform;

pub mod archive;
pub mod pnpm;
pub mod probe;

/// Inputs to toolchain provisioning.
pub struct ToolchainOptions {
    /// Node version to install when the local one does not satisfy the
    /// minimums
    pub node_version: String,
    /// Directory owning the toolchain (`.atrium-toolchain` by default)
    pub toolchain_root: PathBuf,
    /// Base URL for Node distribution archives
    pub download_root: String,
    /// Whether pnpm should be provisioned and used for installs
    pub want_pnpm: bool,
    /// pnpm version to install
    pub pnpm_version: String,
}

/// Resolved toolchain for the rest of the pipeline.
pub struct ToolchainState {
    /// Detected Node version
    pub node_version: Version,
    /// Detected npm version
    pub npm_version: Version,
    /// The canonical Node install directory
    pub install_dir: PathBuf,
    /// Path of the node binary
    pub node_binary: PathBuf,
    /// Path of the npm launcher
    pub npm_binary: PathBuf,
    /// Path of the pnpm launcher, when provisioned
    pub pnpm_binary: Option<PathBuf>,
    /// Whether pnpm survived provisioning and should be used for installs
    pub pnpm_enabled: bool,
}

impl ToolchainState {
    /// The package manager binary installs should use.
    #[must_use]
    pub fn package_manager(&self) -> &Path {
        match (&self.pnpm_binary, self.pnpm_enabled) {
            (Some(pnpm), true) => pnpm,
            _ => &self.npm_binary,
        }
    }
}

/// Ensure a working toolchain, installing whatever is missing or stale.
pub async fn ensure_toolchain(options: &ToolchainOptions) -> Result<ToolchainState> {
    let install_dir = options.toolchain_root.join(NODE_INSTALL_DIR);

    let versions = match probe_existing(&install_dir).await {
        Some(versions) => {
            tracing::info!(
                target: "toolchain",
                "Using existing Node {} / npm {} at {}",
                versions.0,
                versions.1,
                install_dir.display()
            );
            versions
        }
        None => install_node(options, &install_dir).await?,
    };

    let mut state = ToolchainState {
        node_version: versions.0,
        npm_version: versions.1,
        node_binary: platform::node_executable(&install_dir),
        npm_binary: platform::npm_executable(&install_dir),
        install_dir,
        pnpm_binary: None,
        pnpm_enabled: false,
    };

    if options.want_pnpm {
        provision_pnpm(options, &mut state).await?;
    }

    Ok(state)
}

/// Probe an existing install; `Some` only when both tools satisfy the
/// supported minimums.
async fn probe_existing(install_dir: &Path) -> Option<(Version, Version)> {
    if !install_dir.is_dir() {
        return None;
    }
    let node_binary = platform::node_executable(install_dir);
    let node_version = probe::probe_version(&node_binary, true).await.ok()?;
    if !probe::meets_minimum(&node_version, SUPPORTED_NODE_VERSION) {
        tracing::info!(
            target: "toolchain",
            "Installed Node {} is below the supported minimum {}.{}",
            node_version,
            SUPPORTED_NODE_VERSION.0,
            SUPPORTED_NODE_VERSION.1
        );
        return None;
    }

    let npm_binary = platform::npm_executable(install_dir);
    let npm_version = probe::probe_version(&npm_binary, true).await.ok()?;
    if !probe::meets_minimum(&npm_version, SUPPORTED_NPM_VERSION) {
        tracing::info!(
            target: "toolchain",
            "Installed npm {} is below the supported minimum {}.{}",
            npm_version,
            SUPPORTED_NPM_VERSION.0,
            SUPPORTED_NPM_VERSION.1
        );
        return None;
    }

    Some((node_version, npm_version))
}

/// Download, unpack, and validate a fresh Node install.
async fn install_node(
    options: &ToolchainOptions,
    install_dir: &Path,
) -> Result<(Version, Version)> {
    let descriptor = platform::node_platform_descriptor()?;
    let extension = platform::node_archive_extension();
    let version = &options.node_version;
    let archive_stem = format!("node-v{version}-{descriptor}");
    let archive_name = format!("{archive_stem}.{extension}");
    let url = format!("{}v{version}/{archive_name}", options.download_root);

    tracing::info!(
        target: "toolchain",
        "Installing Node {} ({}) into {}",
        version,
        descriptor,
        install_dir.display()
    );

    ensure_dir(&options.toolchain_root)?;
    let archive_path = options.toolchain_root.join(&archive_name);
    archive::download_archive(&url, &archive_path).await?;
    archive::unpack_archive(&archive_path, &options.toolchain_root)?;
    archive::promote_extracted_dir(&options.toolchain_root.join(&archive_stem), install_dir)?;
    archive::finish_unix_layout(install_dir)?;
    let _ = std::fs::remove_file(&archive_path);

    // Re-probe the fresh install; a still-failing toolchain is fatal
    let node_binary = platform::node_executable(install_dir);
    let node_version = match probe::probe_version(&node_binary, false).await {
        Ok(v) if probe::meets_minimum(&v, SUPPORTED_NODE_VERSION) => v,
        Ok(v) => {
            return Err(corrupt("node", &v.to_string(), SUPPORTED_NODE_VERSION));
        }
        Err(e) => {
            return Err(corrupt("node", &format!("probe failed: {e}"), SUPPORTED_NODE_VERSION));
        }
    };

    let npm_binary = platform::npm_executable(install_dir);
    let npm_version = match probe::probe_version(&npm_binary, false).await {
        Ok(v) if probe::meets_minimum(&v, SUPPORTED_NPM_VERSION) => v,
        Ok(v) => {
            return Err(corrupt("npm", &v.to_string(), SUPPORTED_NPM_VERSION));
        }
        Err(e) => {
            return Err(corrupt("npm", &format!("probe failed: {e}"), SUPPORTED_NPM_VERSION));
        }
    };

    tracing::info!(
        target: "toolchain",
        "Node {} and npm {} installed",
        node_version,
        npm_version
    );
    Ok((node_version, npm_version))
}

fn corrupt(tool: &str, detected: &str, minimum: (u64, u64)) -> anyhow::Error {
    AtriumError::ToolchainCorrupt {
        tool: tool.to_string(),
        detected: detected.to_string(),
        minimum: format!("{}.{}", minimum.0, minimum.1),
    }
    .into()
}

/// Provision pnpm, degrading to npm on install failure.
async fn provision_pnpm(options: &ToolchainOptions, state: &mut ToolchainState) -> Result<()> {
    let launcher = platform::pnpm_executable(&options.toolchain_root);

    if pnpm::pnpm_satisfied(&options.toolchain_root, &options.pnpm_version).await {
        tracing::debug!(target: "toolchain", "pnpm {} already present", options.pnpm_version);
        state.pnpm_binary = Some(launcher);
        state.pnpm_enabled = true;
        return Ok(());
    }

    match pnpm::bootstrap_pnpm(&state.npm_binary, &options.toolchain_root, &options.pnpm_version)
        .await
    {
        Ok(_) => {
            state.pnpm_binary = Some(launcher);
            state.pnpm_enabled = true;
            Ok(())
        }
        Err(e) => {
            // A post-install version mismatch means inconsistent local
            // state; everything else degrades to npm
            if matches!(
                e.downcast_ref::<AtriumError>(),
                Some(AtriumError::PnpmVersionMismatch { .. })
            ) {
                return Err(e);
            }
            tracing::warn!(
                target: "toolchain",
                "pnpm installation failed, falling back to npm for this run: {}",
                e
            );
            state.pnpm_enabled = false;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests;
