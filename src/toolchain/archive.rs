//! Download, unpack, and post-install wiring of Node distribution archives.
//!
//! Archives are fetched from the configured download root, staged under a
//! `.part` name so an interrupted transfer never leaves a plausible-looking
//! archive behind, unpacked (zip on Windows, gzipped tar elsewhere), and
//! the versioned top-level directory is renamed to the canonical install
//! directory name.
//!
//! # Launcher links
//!
//! Unix tarballs ship npm under `lib/node_modules/npm` with launcher
//! symlinks in `bin/`. Unpacking does not always preserve those links, so
//! they are recreated explicitly. Additionally, the framework's
//! resource-path detection probes the Windows-convention location
//! `node_modules/npm` directly under the install directory on every OS, so
//! that path is faked with one more link. Filesystems that refuse symlink
//! creation (overlayfs, some FUSE mounts) get a file copy instead.

use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::Path;

use crate::core::AtriumError;
use crate::utils::fs::{copy_dir_all, ensure_dir, remove_dir_if_exists};
use crate::utils::progress;

/// Fetch `url` into `dest`, staging under `<dest>.part` until complete.
pub async fn download_archive(url: &str, dest: &Path) -> Result<()> {
    tracing::info!(target: "toolchain", "Downloading {}", url);
    ensure_dir(dest.parent().unwrap_or_else(|| Path::new(".")))?;

    let response = reqwest::get(url).await.map_err(|e| AtriumError::DownloadFailed {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    let response = response.error_for_status().map_err(|e| AtriumError::DownloadFailed {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    let total = response.content_length().unwrap_or(0);
    let bar = progress::download_bar(total, "node distribution");

    let bytes = response.bytes().await.map_err(|e| AtriumError::DownloadFailed {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    bar.set_position(bytes.len() as u64);

    let staging = dest.with_extension("part");
    let mut file = fs::File::create(&staging)
        .with_context(|| format!("Failed to create {}", staging.display()))?;
    file.write_all(&bytes)
        .with_context(|| format!("Failed to write {}", staging.display()))?;
    drop(file);
    fs::rename(&staging, dest)
        .with_context(|| format!("Failed to move archive into place: {}", dest.display()))?;

    bar.finish_and_clear();
    tracing::debug!(target: "toolchain", "Downloaded {} bytes to {}", bytes.len(), dest.display());
    Ok(())
}

/// Unpack `archive` into `target_dir` (created if missing). Dispatches on
/// the archive extension: `.zip` or gzipped tar.
pub fn unpack_archive(archive: &Path, target_dir: &Path) -> Result<()> {
    ensure_dir(target_dir)?;
    let name = archive.to_string_lossy();
    if name.ends_with(".zip") { unpack_zip(archive, target_dir) } else { unpack_tar_gz(archive, target_dir) }
}

fn unpack_zip(archive: &Path, target_dir: &Path) -> Result<()> {
    let file = fs::File::open(archive)
        .with_context(|| format!("Failed to open archive: {}", archive.display()))?;
    let mut zip = zip::ZipArchive::new(file).map_err(|e| AtriumError::ArchiveError {
        archive: archive.display().to_string(),
        reason: e.to_string(),
    })?;
    zip.extract(target_dir).map_err(|e| AtriumError::ArchiveError {
        archive: archive.display().to_string(),
        reason: e.to_string(),
    })?;
    Ok(())
}

fn unpack_tar_gz(archive: &Path, target_dir: &Path) -> Result<()> {
    let file = fs::File::open(archive)
        .with_context(|| format!("Failed to open archive: {}", archive.display()))?;
    let decoder = flate2::read::GzDecoder::new(file);
    let mut tar = tar::Archive::new(decoder);
    tar.unpack(target_dir).map_err(|e| {
        anyhow::Error::from(AtriumError::ArchiveError {
            archive: archive.display().to_string(),
            reason: e.to_string(),
        })
    })?;
    Ok(())
}

/// Rename the versioned extraction directory (`node-v18.16.0-linux-x64`) to
/// the canonical install directory, replacing any previous install.
pub fn promote_extracted_dir(extracted: &Path, install_dir: &Path) -> Result<()> {
    if !extracted.is_dir() {
        return Err(AtriumError::ArchiveError {
            archive: extracted.display().to_string(),
            reason: "expected extraction directory is missing".to_string(),
        }
        .into());
    }
    remove_dir_if_exists(install_dir)?;
    fs::rename(extracted, install_dir).with_context(|| {
        format!("Failed to rename {} to {}", extracted.display(), install_dir.display())
    })
}

/// Recreate the npm/npx launcher links and the faked `node_modules/npm`
/// path, then mark the node binary executable. No-op on Windows, where the
/// archive layout already matches what consumers expect.
pub fn finish_unix_layout(install_dir: &Path) -> Result<()> {
    if crate::utils::is_windows() {
        return Ok(());
    }

    let npm_dir = install_dir.join("lib").join("node_modules").join("npm");
    let bin_dir = install_dir.join("bin");
    link_or_copy(&npm_dir.join("bin").join("npm-cli.js"), &bin_dir.join("npm"))?;
    link_or_copy(&npm_dir.join("bin").join("npx-cli.js"), &bin_dir.join("npx"))?;

    // The framework's npm detection checks <install>/node_modules/npm on
    // every platform, mirroring the Windows archive layout.
    let faked = install_dir.join("node_modules");
    ensure_dir(&faked)?;
    link_or_copy(&npm_dir, &faked.join("npm"))?;

    mark_executable(&bin_dir.join("node"))?;
    Ok(())
}

/// Symlink `target` at `link`, replacing whatever is there; fall back to a
/// copy when the filesystem rejects symlinks.
fn link_or_copy(target: &Path, link: &Path) -> Result<()> {
    if link.exists() || fs::symlink_metadata(link).is_ok() {
        if link.is_dir() && fs::symlink_metadata(link).map(|m| !m.file_type().is_symlink()).unwrap_or(false) {
            fs::remove_dir_all(link)?;
        } else {
            fs::remove_file(link)?;
        }
    }

    #[cfg(unix)]
    {
        if std::os::unix::fs::symlink(target, link).is_ok() {
            return Ok(());
        }
        tracing::debug!(
            target: "toolchain",
            "Symlink creation failed for {}, copying instead",
            link.display()
        );
    }

    if target.is_dir() {
        copy_dir_all(target, link)
    } else {
        fs::copy(target, link)
            .map(|_| ())
            .with_context(|| format!("Failed to copy {} to {}", target.display(), link.display()))
    }
}

fn mark_executable(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(path)
            .with_context(|| format!("Missing node binary: {}", path.display()))?
            .permissions();
        perms.set_mode(0o755);
        fs::set_permissions(path, perms)
            .with_context(|| format!("Failed to set permissions on {}", path.display()))?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}
