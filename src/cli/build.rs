//! Build production frontend resources.
//!
//! Runs the full pipeline: the shared front half, then classpath resource
//! aggregation, the production token, and the webpack bundle. A failed
//! bundle is logged and the command still completes with the size report;
//! packaging decides what to do with a partial tree.

use anyhow::Result;
use clap::Args;

use super::ProjectArgs;
use crate::pipeline;

/// Command to build production frontend resources.
#[derive(Args)]
pub struct BuildCommand {
    #[command(flatten)]
    pub project: ProjectArgs,
}

impl BuildCommand {
    /// Execute the production flow.
    pub async fn execute(self) -> Result<()> {
        let options = self.project.pipeline_options()?;
        pipeline::prepare_production(&options).await
    }
}
