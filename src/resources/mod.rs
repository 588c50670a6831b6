//! Aggregation of frontend resources embedded in classpath artifacts.
//!
//! Framework add-ons ship frontend assets inside their jars under
//! well-known marker paths. The host build resolves the runtime classpath
//! and passes the artifact list in; this module scans each artifact (zip
//! archive or expanded directory) for the markers and bulk-copies matches
//! into the working frontend tree, with theme assets split into their own
//! output tree.
//!
//! [`ResourceScan`] holds the open archive readers for the duration of the
//! copy phase. It is opened once per run and dropped when copying
//! completes, releasing the underlying file handles on every exit path:
//! the `Drop` impl is the close.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;
use zip::ZipArchive;

use crate::utils::fs::{copy_dir_all, ensure_dir, ensure_parent_dir, force_writable};

/// Interior path prefix marking embedded frontend resources.
pub const FRONTEND_MARKER: &str = "META-INF/resources/frontend";

/// Legacy marker prefix still honored for older add-ons.
pub const FRONTEND_MARKER_LEGACY: &str = "META-INF/frontend";

/// Interior path prefix marking theme resources.
pub const THEME_MARKER: &str = "META-INF/resources/themes";

/// File patterns copied out of archive markers.
const FRONTEND_GLOBS: &[&str] = &["*.js", "*.js.map", "*.css", "*.css.map", "*.ts", "*.ts.map"];

/// One artifact that contained at least one marker entry.
enum ScannedArtifact {
    /// An expanded directory on the classpath
    Directory(PathBuf),
    /// A zip archive, kept open with its matching entry names cached
    Archive { path: PathBuf, zip: ZipArchive<fs::File>, entries: Vec<String> },
}

/// The per-run scan over classpath artifacts.
///
/// Owns open archive handles; drop it when the copy phase is done.
pub struct ResourceScan {
    artifacts: Vec<ScannedArtifact>,
}

impl ResourceScan {
    /// Scan `artifact_paths` for marker entries, deduplicating by owning
    /// artifact. Artifacts without any marker content are skipped (and
    /// their handles closed immediately); unreadable archives are logged
    /// and skipped rather than failing the build.
    pub fn open(artifact_paths: &[PathBuf]) -> Result<Self> {
        let mut seen: HashSet<PathBuf> = HashSet::new();
        let mut artifacts = Vec::new();

        for path in artifact_paths {
            if !seen.insert(path.clone()) {
                continue;
            }
            if path.is_dir() {
                if dir_has_markers(path) {
                    artifacts.push(ScannedArtifact::Directory(path.clone()));
                }
            } else if path.is_file() {
                match scan_archive(path) {
                    Ok(Some(artifact)) => artifacts.push(artifact),
                    Ok(None) => {}
                    Err(e) => {
                        tracing::warn!(
                            target: "resources",
                            "Skipping unreadable artifact {}: {}",
                            path.display(),
                            e
                        );
                    }
                }
            }
        }

        Ok(Self { artifacts })
    }

    /// Number of artifacts that contained marker content.
    #[must_use]
    pub fn artifact_count(&self) -> usize {
        self.artifacts.len()
    }

    /// Copy frontend resources into `target`. Returns the number of
    /// copied entries (archive files, or whole marker trees for expanded
    /// directories).
    pub fn copy_frontend(&mut self, target: &Path) -> Result<usize> {
        ensure_dir(target)?;
        let mut copied = 0;

        for artifact in &mut self.artifacts {
            match artifact {
                ScannedArtifact::Directory(dir) => {
                    for marker in [FRONTEND_MARKER, FRONTEND_MARKER_LEGACY] {
                        let source = dir.join(marker);
                        if source.is_dir() {
                            copy_dir_all(&source, target)?;
                            copied += 1;
                        }
                    }
                    // Checked-out trees may be read-only; copied files
                    // must stay writable for later runs to overwrite
                    force_writable(target)?;
                }
                ScannedArtifact::Archive { path, zip, entries } => {
                    for name in entries.iter() {
                        let Some(relative) = frontend_destination(name) else {
                            continue;
                        };
                        let dest = target.join(relative);
                        extract_entry(zip, name, &dest).with_context(|| {
                            format!("Failed to extract {} from {}", name, path.display())
                        })?;
                        copied += 1;
                    }
                }
            }
        }

        Ok(copied)
    }

    /// Copy theme resources into `theme_target`. Returns the file count.
    pub fn copy_themes(&mut self, theme_target: &Path) -> Result<usize> {
        let mut copied = 0;

        for artifact in &mut self.artifacts {
            if let ScannedArtifact::Archive { path, zip, entries } = artifact {
                for name in entries.iter() {
                    let Some(relative) = strip_marker(name, THEME_MARKER) else {
                        continue;
                    };
                    let dest = theme_target.join(relative);
                    extract_entry(zip, name, &dest).with_context(|| {
                        format!("Failed to extract {} from {}", name, path.display())
                    })?;
                    copied += 1;
                }
            }
        }

        Ok(copied)
    }
}

/// Scan every artifact and copy frontend + theme resources. Zero matches is
/// a valid outcome, not a failure.
pub fn aggregate_resources(
    artifact_paths: &[PathBuf],
    target: &Path,
    theme_target: &Path,
) -> Result<()> {
    let start = Instant::now();
    let mut scan = ResourceScan::open(artifact_paths)?;

    if scan.artifact_count() == 0 {
        tracing::info!(target: "resources", "Found no local frontend resources");
        return Ok(());
    }

    let frontend_count = scan.copy_frontend(target)?;
    let theme_count = scan.copy_themes(theme_target)?;
    drop(scan);

    tracing::info!(
        target: "resources",
        "Copied {} frontend and {} theme resources from {} artifacts in {} ms",
        frontend_count,
        theme_count,
        artifact_paths.len(),
        start.elapsed().as_millis()
    );
    Ok(())
}

fn dir_has_markers(dir: &Path) -> bool {
    dir.join(FRONTEND_MARKER).is_dir() || dir.join(FRONTEND_MARKER_LEGACY).is_dir()
}

/// Open an archive and cache its marker entry names; `None` when nothing
/// inside matches.
fn scan_archive(path: &Path) -> Result<Option<ScannedArtifact>> {
    let file = fs::File::open(path)
        .with_context(|| format!("Failed to open artifact: {}", path.display()))?;
    let mut zip = ZipArchive::new(file)
        .with_context(|| format!("Not a readable archive: {}", path.display()))?;

    let mut entries = Vec::new();
    for index in 0..zip.len() {
        let entry = zip
            .by_index(index)
            .with_context(|| format!("Corrupt entry in {}", path.display()))?;
        if !entry.is_file() {
            continue;
        }
        let name = entry.name().to_string();
        if [FRONTEND_MARKER, FRONTEND_MARKER_LEGACY, THEME_MARKER]
            .iter()
            .any(|marker| strip_marker(&name, marker).is_some())
        {
            entries.push(name);
        }
    }

    if entries.is_empty() {
        Ok(None)
    } else {
        Ok(Some(ScannedArtifact::Archive { path: path.to_path_buf(), zip, entries }))
    }
}

/// The path under the target dir for a frontend marker entry, or `None`
/// when the entry is outside both markers or not an allowed file type.
fn frontend_destination(name: &str) -> Option<String> {
    let relative = strip_marker(name, FRONTEND_MARKER)
        .or_else(|| strip_marker(name, FRONTEND_MARKER_LEGACY))?;
    let file_name = relative.rsplit('/').next().unwrap_or(&relative);
    let allowed = FRONTEND_GLOBS.iter().any(|pattern| {
        glob::Pattern::new(pattern).is_ok_and(|p| p.matches(file_name))
    });
    if allowed { Some(relative) } else { None }
}

/// Strip `marker` plus its separator from an interior path.
fn strip_marker(name: &str, marker: &str) -> Option<String> {
    let rest = name.strip_prefix(marker)?;
    let rest = rest.strip_prefix('/')?;
    if rest.is_empty() { None } else { Some(rest.to_string()) }
}

fn extract_entry(zip: &mut ZipArchive<fs::File>, name: &str, dest: &Path) -> Result<()> {
    ensure_parent_dir(dest)?;
    let mut entry = zip.by_name(name)?;
    let mut out = fs::File::create(dest)
        .with_context(|| format!("Failed to create {}", dest.display()))?;
    io::copy(&mut entry, &mut out)?;
    Ok(())
}
