//! Tool version probing and validation.
//!
//! A tool is probed by running `<binary> --version` and parsing what comes
//! back. Real-world output is messy (npm prints warnings before the
//! version, some wrappers echo banners), so normalization takes the last
//! non-blank line, trims it, and strips leading non-digit characters (the
//! `v` in `v18.16.0`) before handing the rest to the semver parser.

use anyhow::{Context, Result};
use semver::Version;
use std::path::Path;

use crate::process::ToolCommand;

/// Extract the version-bearing portion of raw `--version` output.
///
/// Returns `None` when the output contains no non-blank line.
#[must_use]
pub fn normalize_version_output(raw: &str) -> Option<String> {
    let line = raw.lines().rev().find(|line| !line.trim().is_empty())?;
    let stripped = line.trim().trim_start_matches(|c: char| !c.is_ascii_digit());
    if stripped.is_empty() { None } else { Some(stripped.to_string()) }
}

/// Parse raw `--version` output into a semantic version.
pub fn parse_version_output(raw: &str) -> Result<Version> {
    let normalized = normalize_version_output(raw)
        .ok_or_else(|| anyhow::anyhow!("Version output was empty"))?;
    Version::parse(&normalized)
        .with_context(|| format!("Unparseable version string: '{normalized}'"))
}

/// Run `<binary> --version` and parse the reported version.
///
/// `quiet` suppresses the per-probe log line; the installer probes
/// repeatedly while deciding whether to reinstall, and only the final
/// verdict is worth a message.
pub async fn probe_version(binary: &Path, quiet: bool) -> Result<Version> {
    if !binary.exists() {
        anyhow::bail!("Binary does not exist: {}", binary.display());
    }
    let output = ToolCommand::new(binary)
        .arg("--version")
        .with_context(format!("{} --version", binary.display()))
        .run()
        .await?;
    let version = parse_version_output(&output.stdout)?;
    if !quiet {
        tracing::debug!(target: "toolchain", "{} reports {}", binary.display(), version);
    }
    Ok(version)
}

/// Whether `version` satisfies a `(major, minor)` minimum.
#[must_use]
pub fn meets_minimum(version: &Version, minimum: (u64, u64)) -> bool {
    (version.major, version.minor) >= minimum
}
