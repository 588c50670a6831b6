//! Prepare dev-mode frontend resources.
//!
//! Runs the shared pipeline front half (toolchain provisioning, manifest
//! reconciliation, the hash-gated install, and generated entry/config
//! creation), then writes the dev token and stops. Resource aggregation
//! and bundling are production concerns; the dev server compiles on
//! demand.

use anyhow::Result;
use clap::Args;

use super::ProjectArgs;
use crate::pipeline;

/// Command to prepare dev-mode frontend resources.
#[derive(Args)]
pub struct PrepareCommand {
    #[command(flatten)]
    pub project: ProjectArgs,
}

impl PrepareCommand {
    /// Execute the dev flow.
    pub async fn execute(self) -> Result<()> {
        let options = self.project.pipeline_options()?;
        pipeline::prepare_dev(&options).await
    }
}
