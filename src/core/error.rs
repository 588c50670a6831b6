//! Error handling for Atrium
//!
//! The error system is built around two types:
//! - [`AtriumError`] - strongly-typed failure cases for precise handling
//! - [`ErrorContext`] - a display wrapper that adds suggestions for CLI users
//!
//! Most functions return `anyhow::Result` and attach context with
//! `.with_context(..)` at I/O boundaries; the CLI entry point converts the
//! final error into an [`ErrorContext`] via [`user_friendly_error`] before
//! printing it.
//!
//! The taxonomy follows the pipeline's failure posture:
//! - **Fatal**: corrupt toolchain after a reinstall attempt, undeletable
//!   lockfile during forced cleanup, unwritable output directories. These
//!   abort the run with exit code 1.
//! - **Degrading**: pnpm bootstrap failure disables pnpm for the rest of the
//!   run and the pipeline continues on npm.
//! - **Recoverable**: a non-zero install or bundler exit is logged, the hash
//!   marker is left untouched, and the next run retries.
//! - **Ignorable**: missing optional files (lockfiles, hash markers, prior
//!   manifests) are treated as empty state, never as errors.

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for Atrium operations.
///
/// Each variant represents a specific failure mode with enough context to
/// render an actionable message. [`IoError`](Self::IoError) wraps raw I/O
/// failures via a `From` conversion so `?` works at call sites that return
/// this type directly.
#[derive(Error, Debug)]
pub enum AtriumError {
    /// The installed toolchain still fails validation after a fresh
    /// download/unpack cycle. There is nothing further the pipeline can do.
    #[error("Toolchain installation is corrupt: {tool} reports '{detected}', need at least {minimum}")]
    ToolchainCorrupt {
        /// The tool that failed validation ("node" or "npm")
        tool: String,
        /// Version string the binary reported, or a probe failure note
        detected: String,
        /// Minimum supported version (major.minor)
        minimum: String,
    },

    /// Downloading the Node distribution archive failed.
    #[error("Failed to download {url}")]
    DownloadFailed {
        /// The archive URL that could not be fetched
        url: String,
        /// Transport- or status-level reason
        reason: String,
    },

    /// Unpacking or relocating a downloaded archive failed.
    #[error("Failed to unpack archive {archive}")]
    ArchiveError {
        /// Path of the offending archive
        archive: String,
        /// What went wrong while extracting
        reason: String,
    },

    /// A tool subprocess could not be executed or exited non-zero in a
    /// context where the exit code is escalated.
    #[error("Command failed: {operation}")]
    CommandError {
        /// The operation the command was performing (e.g. "npm install")
        operation: String,
        /// Captured stderr of the child process
        stderr: String,
    },

    /// The executable for a required tool is missing.
    #[error("Executable not found: {program}")]
    CommandNotFound {
        /// Path or name of the missing program
        program: String,
    },

    /// A package manifest exists but cannot be parsed as a JSON object.
    #[error("Invalid package manifest {file}")]
    ManifestParseError {
        /// Path to the manifest that failed to parse
        file: String,
        /// Parser diagnostic
        reason: String,
    },

    /// The pnpm bootstrap install exited non-zero. Degrading: the caller
    /// disables pnpm and continues with npm.
    #[error("pnpm {version} installation failed")]
    PnpmInstallFailed {
        /// pnpm version that was being installed
        version: String,
        /// Captured output of the failed install
        reason: String,
    },

    /// pnpm installed without error but `npm list` reports a different
    /// version afterwards. Fatal: local state is inconsistent.
    #[error("pnpm version mismatch after installation: expected pnpm@{expected}")]
    PnpmVersionMismatch {
        /// The version that was requested
        expected: String,
        /// The `npm list` output that lacked the expected token
        output: String,
    },

    /// The lockfile could not be deleted during a forced cleanup. Fatal,
    /// because continuing would reinstall against stale pins.
    #[error("Cannot delete lockfile {path} during cleanup")]
    LockfileDeleteFailed {
        /// Path of the lockfile
        path: String,
    },

    /// A required output directory could not be created.
    #[error("Cannot create output directory {path}")]
    OutputDirCreateFailed {
        /// The directory that could not be created
        path: String,
    },

    /// A bundled template resource is missing or unreadable.
    #[error("Bundled template '{name}' is unavailable")]
    TemplateMissing {
        /// Resource name of the template
        name: String,
    },

    /// I/O error wrapper
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Wrapper adding a user-facing suggestion and optional details to an error.
///
/// Built at the CLI boundary by [`user_friendly_error`]; the typed error
/// stays available for programmatic handling while the display layer shows
/// colored, actionable output.
pub struct ErrorContext {
    /// The underlying error
    pub error: anyhow::Error,
    /// A short, actionable suggestion shown after the error message
    pub suggestion: Option<String>,
    /// Longer background details for the curious
    pub details: Option<String>,
}

impl ErrorContext {
    /// Wrap an error with no suggestion or details.
    pub fn new(error: impl Into<anyhow::Error>) -> Self {
        Self { error: error.into(), suggestion: None, details: None }
    }

    /// Attach an actionable suggestion.
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Attach background details.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr with terminal colors.
    pub fn display(&self) {
        eprintln!("{} {}", "error:".red().bold(), self.error);
        for cause in self.error.chain().skip(1) {
            eprintln!("  {} {}", "caused by:".yellow(), cause);
        }
        if let Some(details) = &self.details {
            eprintln!("\n{details}");
        }
        if let Some(suggestion) = &self.suggestion {
            eprintln!("\n{} {}", "hint:".cyan().bold(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;
        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nhint: {suggestion}")?;
        }
        Ok(())
    }
}

/// Convert any error into an [`ErrorContext`] with a suggestion matched to
/// the failure mode.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    let suggestion = match error.downcast_ref::<AtriumError>() {
        Some(AtriumError::ToolchainCorrupt { .. }) => Some(
            "Delete the toolchain directory (.atrium-toolchain by default) and re-run to \
             force a fresh Node installation"
                .to_string(),
        ),
        Some(AtriumError::DownloadFailed { .. }) => Some(
            "Check network connectivity, or point --node-download-root at a reachable mirror"
                .to_string(),
        ),
        Some(AtriumError::CommandNotFound { program }) => {
            Some(format!("'{program}' was expected inside the managed toolchain; re-run to reinstall it"))
        }
        Some(AtriumError::ManifestParseError { file, .. }) => {
            Some(format!("Fix the JSON syntax in {file}, or delete it to regenerate defaults"))
        }
        Some(AtriumError::LockfileDeleteFailed { path }) => {
            Some(format!("Remove {path} manually (another process may be holding it open)"))
        }
        Some(AtriumError::PnpmVersionMismatch { .. }) => Some(
            "Delete node_modules inside the toolchain directory and re-run".to_string(),
        ),
        _ => None,
    };

    let mut ctx = ErrorContext::new(error);
    if let Some(s) = suggestion {
        ctx = ctx.with_suggestion(s);
    }
    ctx
}
