//! The build pipeline: sequencing of toolchain setup, manifest
//! reconciliation, dependency installation, resource aggregation, config
//! patching, and the bundler run.
//!
//! Two top-level flows exist. `prepare` (dev) stops right after the entry
//! point and bundler configuration are generated; the dev server compiles
//! on demand. `build` (production) continues through classpath resource
//! aggregation and the webpack run.
//!
//! Stages run strictly in order and each blocks until complete; re-running
//! either flow is safe because every stage is gated on observed state
//! (version probes, dependency hashes, file presence) rather than on
//! whether it ran before.

use anyhow::Result;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::bundler;
use crate::constants::{
    PACKAGE_JSON, PACKAGE_LOCK_JSON, PNPM_HOOK_FILE, WEBPACK_CONFIG, WEBPACK_GENERATED,
};
use crate::installer::{self, InstallRequest};
use crate::manifest::reconcile::reconcile_required_packages;
use crate::manifest::ManifestDocument;
use crate::resources::aggregate_resources;
use crate::toolchain::{ToolchainOptions, ToolchainState, ensure_toolchain};
use crate::utils::fs::{ensure_dir, remove_dir_if_exists, write_text_file};

/// Name of the generated entry point file inside the generated dir.
const GENERATED_ENTRY: &str = "generated-entry.js";

/// Resolved directory schema of one project.
#[derive(Debug, Clone)]
pub struct ProjectLayout {
    /// Project root all other paths were resolved against
    pub project_root: PathBuf,
    /// Working dir for manifests, node_modules, and bundler config
    pub build_dir: PathBuf,
    /// User-authored frontend sources
    pub frontend_dir: PathBuf,
    /// Build-owned generated frontend tree
    pub generated_dir: PathBuf,
    /// Directory owning the Node/pnpm toolchain
    pub toolchain_root: PathBuf,
}

impl ProjectLayout {
    /// The user-owned manifest in the build dir.
    #[must_use]
    pub fn main_package_json(&self) -> PathBuf {
        self.build_dir.join(PACKAGE_JSON)
    }

    /// The build-owned generated manifest.
    #[must_use]
    pub fn generated_package_json(&self) -> PathBuf {
        self.generated_dir.join(PACKAGE_JSON)
    }

    /// The generated bundler configuration.
    #[must_use]
    pub fn webpack_generated(&self) -> PathBuf {
        self.build_dir.join(WEBPACK_GENERATED)
    }

    /// The user-owned bundler entry configuration.
    #[must_use]
    pub fn webpack_config(&self) -> PathBuf {
        self.build_dir.join(WEBPACK_CONFIG)
    }

    /// The generated application entry point.
    #[must_use]
    pub fn generated_entry_point(&self) -> PathBuf {
        self.generated_dir.join(GENERATED_ENTRY)
    }

    /// Where the bundler writes packaged output.
    #[must_use]
    pub fn bundle_output_dir(&self) -> PathBuf {
        self.build_dir.join("resources")
    }

    /// Where aggregated theme resources land.
    #[must_use]
    pub fn theme_output_dir(&self) -> PathBuf {
        self.build_dir.join("theme")
    }
}

/// All inputs of one pipeline run.
pub struct PipelineOptions {
    pub layout: ProjectLayout,
    /// Pinned Node version
    pub node_version: String,
    /// Node distribution mirror
    pub download_root: String,
    /// Provision and use pnpm instead of npm
    pub use_pnpm: bool,
    /// Pinned pnpm version
    pub pnpm_version: String,
    /// Resolved classpath artifacts to scan for embedded resources
    pub classpath: Vec<PathBuf>,
    /// Scanned required-package map (name -> version); `None` when the host
    /// supplied no scanner output, which disables pruning for the run
    pub required_packages: Option<BTreeMap<String, String>>,
    /// Verbose bundler mode
    pub debug: bool,
}

/// Dev flow: toolchain, manifests, install, entry/config generation, dev
/// token. Short-circuits before resource aggregation and bundling.
pub async fn prepare_dev(options: &PipelineOptions) -> Result<()> {
    let toolchain = prepare_common(options).await?;

    let token = bundler::TokenFile::dev(
        toolchain.pnpm_enabled,
        options.debug,
        options.layout.build_dir.clone(),
        options.layout.generated_dir.clone(),
        options.layout.frontend_dir.clone(),
    );
    bundler::write_token(&options.layout.build_dir, &token)?;

    tracing::info!(target: "pipeline", "Dev resources ready in {}", options.layout.build_dir.display());
    Ok(())
}

/// Production flow: everything dev does, then classpath resource
/// aggregation, the prod token, and the webpack run.
pub async fn prepare_production(options: &PipelineOptions) -> Result<()> {
    let toolchain = prepare_common(options).await?;

    aggregate_resources(
        &options.classpath,
        &options.layout.generated_dir,
        &options.layout.theme_output_dir(),
    )?;

    let token = bundler::TokenFile::production(toolchain.pnpm_enabled, options.debug);
    bundler::write_token(&options.layout.build_dir, &token)?;

    let request = bundler::BundleRequest {
        node_binary: toolchain.node_binary.clone(),
        webpack_cli: bundler::webpack_cli_script(&options.layout.build_dir),
        config_path: options.layout.webpack_generated(),
        working_dir: options.layout.build_dir.clone(),
        debug: options.debug,
    };
    // Best effort: a failed bundle is reported, not raised, and the size
    // report below still describes whatever landed on disk
    let _bundled = bundler::run_bundler(&request).await?;
    bundler::report_bundle_size(&options.layout.bundle_output_dir());

    Ok(())
}

/// The shared front half of both flows.
async fn prepare_common(options: &PipelineOptions) -> Result<ToolchainState> {
    let layout = &options.layout;
    ensure_dir(&layout.build_dir).map_err(|_| crate::core::AtriumError::OutputDirCreateFailed {
        path: layout.build_dir.display().to_string(),
    })?;
    bundler::remove_stale_tokens(&layout.build_dir)?;

    let toolchain = ensure_toolchain(&ToolchainOptions {
        node_version: options.node_version.clone(),
        toolchain_root: layout.toolchain_root.clone(),
        download_root: options.download_root.clone(),
        want_pnpm: options.use_pnpm,
        pnpm_version: options.pnpm_version.clone(),
    })
    .await?;

    bootstrap_frontend_dir(&layout.frontend_dir)?;

    // Main manifest first: its merged state feeds the generated manifest
    // and must be persisted before the dependency hash is computed
    let mut main = ManifestDocument::load(&layout.main_package_json())?;
    let default_insertions = main.ensure_defaults(false);
    let mut manifest_modified = default_insertions > 0;
    if manifest_modified {
        tracing::debug!(
            target: "manifest",
            "Inserted {} default entries into {}",
            default_insertions,
            layout.main_package_json().display()
        );
        main.save(&layout.main_package_json())?;
    }

    let mut generated = ManifestDocument::load(&layout.generated_package_json())?;
    let generated_snapshot = generated.clone();
    generated.merge_from(&main);
    let outcome = match &options.required_packages {
        Some(required) => {
            reconcile_required_packages(&mut generated, required, &main, &layout.build_dir)
        }
        None => Default::default(),
    };
    let dependency_hash = generated.dependencies_hash();
    if main.update_stored_hash(&dependency_hash) {
        manifest_modified = true;
        main.save(&layout.main_package_json())?;
    }
    // Mirror the hash into the generated document so the next run's merge
    // finds it already in place and the snapshot comparison stays stable
    generated.update_stored_hash(&dependency_hash);
    manifest_modified |= generated != generated_snapshot;
    generated.save(&layout.generated_package_json())?;

    let installed = installer::install_if_needed(&InstallRequest {
        toolchain: &toolchain,
        build_dir: layout.build_dir.clone(),
        dependency_hash,
        manifest_modified,
        force_cleanup: outcome.do_cleanup,
    })
    .await?;
    if !installed {
        tracing::warn!(
            target: "pipeline",
            "Dependency install failed; continuing with the previous node_modules state"
        );
    }

    write_generated_entry(&layout.generated_entry_point(), &layout.frontend_dir)?;

    bundler::write_generated_config(&layout.webpack_generated())?;
    let patches = bundler::default_patches(
        &layout.build_dir,
        &layout.frontend_dir,
        &layout.bundle_output_dir(),
        &layout.generated_entry_point(),
    );
    let patched = bundler::patch_config_lines(&layout.webpack_generated(), &patches)?;
    tracing::debug!(target: "bundler", "Patched {} config lines", patched);
    bundler::ensure_main_config(&layout.webpack_config())?;

    Ok(toolchain)
}

/// Create the frontend source dir with a starter file when missing, so a
/// fresh checkout reaches a working dev loop in one command.
fn bootstrap_frontend_dir(frontend_dir: &Path) -> Result<()> {
    if frontend_dir.is_dir() {
        return Ok(());
    }
    ensure_dir(frontend_dir)?;
    write_text_file(
        &frontend_dir.join("index.html"),
        "<!-- Frontend sources live here; this file was created by the build. -->\n",
    )?;
    tracing::info!(target: "pipeline", "Created frontend directory {}", frontend_dir.display());
    Ok(())
}

/// Write the generated application entry point referenced by the bundler
/// config.
fn write_generated_entry(entry_path: &Path, frontend_dir: &Path) -> Result<()> {
    let mut content = String::from(
        "/**\n * NOTICE: this is an auto-generated file.\n *\n * Entry point collecting the \
         application's frontend imports. Regenerated\n * on each build.\n */\n",
    );
    if frontend_dir.join("index.js").is_file() || frontend_dir.join("index.ts").is_file() {
        content.push_str("import 'Frontend/index';\n");
    }
    content.push_str("window.Atrium = window.Atrium || {};\n");
    write_text_file(entry_path, &content)
}

/// Remove everything the pipeline can regenerate: installed packages, the
/// lockfile, generated config and entry, the install marker, token files,
/// and the pnpm hook file. User manifests and sources are untouched.
pub fn clean(layout: &ProjectLayout) -> Result<()> {
    remove_dir_if_exists(&layout.build_dir.join("node_modules"))?;
    remove_dir_if_exists(&layout.generated_dir)?;
    remove_dir_if_exists(&layout.build_dir.join(crate::constants::HASH_MARKER_DIR))?;

    for file in [
        layout.build_dir.join(PACKAGE_LOCK_JSON),
        layout.webpack_generated(),
        layout.build_dir.join(PNPM_HOOK_FILE),
    ] {
        if file.exists() {
            std::fs::remove_file(&file)?;
        }
    }
    bundler::remove_stale_tokens(&layout.build_dir)?;

    tracing::info!(target: "pipeline", "Cleaned {}", layout.build_dir.display());
    Ok(())
}
