//! Command-line interface for Atrium.
//!
//! Each command is implemented as a separate module with its own argument
//! struct and execution logic:
//! - `prepare` - dev flow: toolchain, manifests, install, generated config
//! - `build` - production flow: prepare plus resource aggregation and the
//!   webpack bundle
//! - `clean` - remove regenerable state
//!
//! # Usage
//!
//! ```bash
//! # Get a project dev-ready
//! atrium prepare
//!
//! # Produce the production bundle, scanning the resolved classpath
//! atrium build --classpath build/classpath.txt \
//!     --required-packages build/frontend-deps.json
//!
//! # Start over
//! atrium clean
//! ```

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::constants::{
    DEFAULT_NODE_DOWNLOAD_ROOT, DEFAULT_NODE_VERSION, DEFAULT_PNPM_VERSION,
    DEFAULT_TOOLCHAIN_DIR,
};
use crate::manifest::reconcile::load_required_packages;
use crate::pipeline::{PipelineOptions, ProjectLayout};
use crate::utils::fs::{absolutize, read_text_file};

mod build;
mod clean;
mod prepare;

/// Main CLI application structure for Atrium.
#[derive(Parser)]
#[command(
    name = "atrium",
    about = "Atrium - frontend toolchain orchestrator for embedded web UIs",
    version,
    author,
    long_about = "Atrium prepares the Node.js/npm/webpack half of a hybrid application build: \
                  it provisions a pinned toolchain, reconciles package manifests, runs \
                  hash-gated installs, and drives the webpack bundle."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output for debugging and detailed information
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress all output except errors for automation
    #[arg(short, long, global = true)]
    quiet: bool,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Prepare dev-mode frontend resources
    Prepare(prepare::PrepareCommand),
    /// Build production frontend resources and run the bundler
    Build(build::BuildCommand),
    /// Remove installed packages and generated files
    Clean(clean::CleanCommand),
}

impl Cli {
    /// Initialize logging per the verbosity flags and run the selected
    /// command.
    pub async fn execute(self) -> Result<()> {
        self.init_logging();
        match self.command {
            Commands::Prepare(cmd) => cmd.execute().await,
            Commands::Build(cmd) => cmd.execute().await,
            Commands::Clean(cmd) => cmd.execute(),
        }
    }

    /// Set up the tracing subscriber. `RUST_LOG` wins when set, so targeted
    /// filters like `RUST_LOG=npm=trace` keep working.
    fn init_logging(&self) {
        let default_filter = if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "info"
        };
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Options shared by the pipeline-running commands.
#[derive(Args, Clone)]
pub struct ProjectArgs {
    /// Project root directory
    #[arg(long, default_value = ".")]
    pub project_root: PathBuf,

    /// Build working directory, relative to the project root
    #[arg(long, default_value = "build")]
    pub build_dir: PathBuf,

    /// User frontend source directory, relative to the project root
    #[arg(long, default_value = "frontend")]
    pub frontend_dir: PathBuf,

    /// Generated frontend directory; defaults to `<build-dir>/frontend`
    #[arg(long)]
    pub generated_dir: Option<PathBuf>,

    /// Toolchain directory, relative to the project root
    #[arg(long, default_value = DEFAULT_TOOLCHAIN_DIR)]
    pub toolchain_dir: PathBuf,

    /// Node.js version to provision
    #[arg(long, default_value = DEFAULT_NODE_VERSION)]
    pub node_version: String,

    /// Mirror to download Node.js distributions from
    #[arg(long, default_value = DEFAULT_NODE_DOWNLOAD_ROOT)]
    pub node_download_root: String,

    /// Install dependencies with pnpm instead of npm
    #[arg(long)]
    pub pnpm: bool,

    /// pnpm version to provision when --pnpm is set
    #[arg(long, default_value = DEFAULT_PNPM_VERSION)]
    pub pnpm_version: String,

    /// File listing resolved classpath artifacts, one path per line
    #[arg(long)]
    pub classpath: Option<PathBuf>,

    /// JSON file with the scanned required-package map
    #[arg(long)]
    pub required_packages: Option<PathBuf>,

    /// Verbose bundler output
    #[arg(long)]
    pub debug: bool,
}

impl ProjectArgs {
    /// Resolve the directory schema against the project root.
    #[must_use]
    pub fn layout(&self) -> ProjectLayout {
        let root = &self.project_root;
        let build_dir = absolutize(root, &self.build_dir);
        let generated_dir = match &self.generated_dir {
            Some(dir) => absolutize(root, dir),
            None => build_dir.join("frontend"),
        };
        ProjectLayout {
            project_root: root.clone(),
            frontend_dir: absolutize(root, &self.frontend_dir),
            generated_dir,
            toolchain_root: absolutize(root, &self.toolchain_dir),
            build_dir,
        }
    }

    /// Load the collaborator inputs and assemble pipeline options.
    pub fn pipeline_options(&self) -> Result<PipelineOptions> {
        let classpath = match &self.classpath {
            Some(file) => read_classpath_file(file)?,
            None => Vec::new(),
        };
        let required_packages: Option<BTreeMap<String, String>> = self
            .required_packages
            .as_ref()
            .map(|file| load_required_packages(file))
            .transpose()?;

        Ok(PipelineOptions {
            layout: self.layout(),
            node_version: self.node_version.clone(),
            download_root: self.node_download_root.clone(),
            use_pnpm: self.pnpm,
            pnpm_version: self.pnpm_version.clone(),
            classpath,
            required_packages,
            debug: self.debug,
        })
    }
}

/// Parse a newline-separated classpath listing, skipping blanks.
fn read_classpath_file(path: &std::path::Path) -> Result<Vec<PathBuf>> {
    let content = read_text_file(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(PathBuf::from)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn layout_defaults_nest_generated_under_build() {
        let cli = Cli::parse_from(["atrium", "prepare", "--project-root", "/p"]);
        let Commands::Prepare(cmd) = cli.command else {
            panic!("expected prepare command");
        };
        let layout = cmd.project.layout();
        assert_eq!(layout.build_dir, PathBuf::from("/p/build"));
        assert_eq!(layout.generated_dir, PathBuf::from("/p/build/frontend"));
        assert_eq!(layout.frontend_dir, PathBuf::from("/p/frontend"));
        assert_eq!(layout.toolchain_root, PathBuf::from("/p/.atrium-toolchain"));
    }

    #[test]
    fn classpath_file_parses_one_path_per_line() {
        let tmp = tempdir().unwrap();
        let file = tmp.path().join("classpath.txt");
        fs::write(&file, "/repo/a.jar\n\n  /repo/b.jar  \n").unwrap();

        let paths = read_classpath_file(&file).unwrap();
        assert_eq!(paths, vec![PathBuf::from("/repo/a.jar"), PathBuf::from("/repo/b.jar")]);
    }

    #[test]
    fn pipeline_options_carry_flags() {
        let cli = Cli::parse_from([
            "atrium",
            "build",
            "--pnpm",
            "--node-version",
            "18.0.0",
            "--debug",
        ]);
        let Commands::Build(cmd) = cli.command else {
            panic!("expected build command");
        };
        let options = cmd.project.pipeline_options().unwrap();
        assert!(options.use_pnpm);
        assert!(options.debug);
        assert_eq!(options.node_version, "18.0.0");
        assert!(options.required_packages.is_none());
        assert!(options.classpath.is_empty());
    }
}
