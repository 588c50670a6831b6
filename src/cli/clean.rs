//! Remove regenerable build state.
//!
//! The manual form of the reconciler's forced cleanup: deletes installed
//! packages, the lockfile, generated config and entry files, the install
//! marker, and token files. User manifests, frontend sources, and the
//! installed toolchain are untouched; `prepare` or `build` rebuilds
//! everything removed here.

use anyhow::Result;
use clap::Args;

use super::ProjectArgs;
use crate::pipeline;

/// Command to remove installed packages and generated files.
#[derive(Args)]
pub struct CleanCommand {
    #[command(flatten)]
    pub project: ProjectArgs,
}

impl CleanCommand {
    /// Execute the cleanup.
    pub fn execute(self) -> Result<()> {
        pipeline::clean(&self.project.layout())
    }
}
