//! Webpack invocation.
//!
//! webpack runs through the managed Node binary against the generated
//! configuration. The invocation is launched asynchronously and, in debug
//! mode, its stdout is drained into the provided sink concurrently with
//! waiting for exit, not for throughput but so the child never deadlocks
//! on a full pipe buffer. In non-debug mode stdout is discarded and only a
//! `--silent` summary failure would surface through stderr.
//!
//! A non-zero exit is reported through the logs and the pipeline carries on
//! to its bundle-size report; the build as a whole stays best-effort here.

use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::process::ToolCommand;
use crate::utils::fs::dir_size;

/// Everything needed to run the bundler once.
pub struct BundleRequest {
    /// The managed node binary
    pub node_binary: PathBuf,
    /// The webpack CLI script inside `node_modules`
    pub webpack_cli: PathBuf,
    /// The generated configuration file
    pub config_path: PathBuf,
    /// Working directory for the child (the build dir)
    pub working_dir: PathBuf,
    /// Verbose bundler output, streamed into the log
    pub debug: bool,
}

/// Locate the webpack CLI script under a build dir's `node_modules`.
#[must_use]
pub fn webpack_cli_script(build_dir: &Path) -> PathBuf {
    build_dir.join("node_modules").join("webpack").join("bin").join("webpack.js")
}

/// Run webpack. Returns `true` on a zero exit; a non-zero exit is logged,
/// not raised.
pub async fn run_bundler(request: &BundleRequest) -> Result<bool> {
    let mut command = ToolCommand::new(&request.node_binary)
        .arg(request.webpack_cli.display().to_string())
        .arg("--config")
        .arg(request.config_path.display().to_string())
        .current_dir(&request.working_dir)
        .env("NO_UPDATE_NOTIFIER", "1")
        .with_context("webpack build");

    command = if request.debug {
        command.args(["--progress", "--display-error-details"])
    } else {
        command.arg("--silent")
    };

    tracing::info!(target: "webpack", "Running webpack build");

    let output = if request.debug {
        command.stream(|line| tracing::info!(target: "webpack", "{}", line)).await?
    } else {
        command.output().await?
    };

    if output.success() {
        tracing::info!(target: "webpack", "webpack build finished");
        Ok(true)
    } else {
        tracing::error!(
            target: "webpack",
            "webpack exited with code {}{}",
            output.code(),
            if output.stderr.is_empty() {
                String::new()
            } else {
                format!(":\n{}", output.stderr.trim())
            }
        );
        Ok(false)
    }
}

/// Log the size of the bundled output tree. Runs even after a failed
/// bundle, reporting whatever is on disk.
pub fn report_bundle_size(output_dir: &Path) {
    let bytes = dir_size(output_dir);
    tracing::info!(
        target: "webpack",
        "Bundle output {} is {:.1} KiB",
        output_dir.display(),
        bytes as f64 / 1024.0
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn webpack_cli_lives_under_node_modules() {
        let path = webpack_cli_script(Path::new("/p/build"));
        assert!(path.ends_with("node_modules/webpack/bin/webpack.js"));
    }
}
