//! Platform detection for toolchain provisioning.
//!
//! The Node.js project publishes one archive per `{os}-{arch}` pair, and the
//! executables inside differ in both name and location between Windows and
//! Unix layouts. This module owns all of that variance so the rest of the
//! pipeline can work with plain paths.
//!
//! # ARM detection
//!
//! Compile-time target information cannot distinguish a 32-bit userland on a
//! 64-bit ARM kernel (and vice versa), so ARM targets shell out to
//! `uname -m` and classify from the machine string.

use anyhow::Result;
use std::path::{Path, PathBuf};

/// Checks if the current platform is Windows (compile-time).
#[must_use]
pub const fn is_windows() -> bool {
    cfg!(windows)
}

/// The `{os}-{arch}` descriptor used in Node distribution archive names,
/// e.g. `linux-x64`, `darwin-arm64`, `win-x64`.
pub fn node_platform_descriptor() -> Result<String> {
    let os = if cfg!(windows) {
        "win"
    } else if cfg!(target_os = "macos") {
        "darwin"
    } else {
        "linux"
    };

    let arch = if cfg!(target_arch = "x86_64") {
        "x64".to_string()
    } else if cfg!(target_arch = "x86") {
        "x86".to_string()
    } else if cfg!(any(target_arch = "aarch64", target_arch = "arm")) {
        arm_arch_from_uname()?
    } else {
        anyhow::bail!(
            "Unsupported architecture '{}'; no Node.js distribution exists for it",
            std::env::consts::ARCH
        );
    };

    Ok(format!("{os}-{arch}"))
}

/// Classify an ARM machine by asking the kernel.
///
/// `uname -m` reports the kernel machine string, which is authoritative even
/// when the process runs under a mismatched userland.
fn arm_arch_from_uname() -> Result<String> {
    if !command_exists("uname") {
        anyhow::bail!("'uname' is not available; cannot determine the ARM variant");
    }
    let output = std::process::Command::new("uname")
        .arg("-m")
        .output()
        .map_err(|e| anyhow::anyhow!("Failed to run 'uname -m' for ARM detection: {e}"))?;
    let machine = String::from_utf8_lossy(&output.stdout).trim().to_string();
    Ok(classify_arm_machine(&machine))
}

/// Map a `uname -m` machine string to a Node arch token.
#[must_use]
pub fn classify_arm_machine(machine: &str) -> String {
    if machine.starts_with("aarch64") || machine.starts_with("arm64") {
        "arm64".to_string()
    } else if machine.starts_with("armv7") {
        "armv7l".to_string()
    } else {
        // Older boards (armv6 and below) all use the v6 build
        "armv6l".to_string()
    }
}

/// Extension of the Node distribution archive for this platform.
#[must_use]
pub const fn node_archive_extension() -> &'static str {
    if is_windows() { "zip" } else { "tar.gz" }
}

/// Path of the Node binary inside an install directory.
///
/// Windows archives put `node.exe` at the top level; Unix tarballs put
/// `bin/node` under a prefix layout.
#[must_use]
pub fn node_executable(install_dir: &Path) -> PathBuf {
    if is_windows() { install_dir.join("node.exe") } else { install_dir.join("bin").join("node") }
}

/// Path of the npm launcher inside an install directory.
#[must_use]
pub fn npm_executable(install_dir: &Path) -> PathBuf {
    if is_windows() { install_dir.join("npm.cmd") } else { install_dir.join("bin").join("npm") }
}

/// Path of the pnpm launcher installed into the toolchain root.
#[must_use]
pub fn pnpm_executable(toolchain_root: &Path) -> PathBuf {
    let bin = toolchain_root.join("node_modules").join(".bin");
    if is_windows() { bin.join("pnpm.cmd") } else { bin.join("pnpm") }
}

/// The directory prepended to the child PATH so nested npm scripts find the
/// managed Node runtime.
#[must_use]
pub fn node_path_entry(install_dir: &Path) -> PathBuf {
    if is_windows() { install_dir.to_path_buf() } else { install_dir.join("bin") }
}

/// Join a new entry onto the current PATH value.
#[must_use]
pub fn prepend_to_path(entry: &Path) -> String {
    let separator = if is_windows() { ';' } else { ':' };
    let current = std::env::var("PATH").unwrap_or_default();
    if current.is_empty() {
        entry.display().to_string()
    } else {
        format!("{}{}{}", entry.display(), separator, current)
    }
}

/// Checks if a command is available in the system PATH.
#[must_use]
pub fn command_exists(cmd: &str) -> bool {
    which::which(cmd).is_ok()
}
