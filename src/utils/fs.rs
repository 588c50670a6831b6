//! File system operations with consistent error context.
//!
//! Thin wrappers over `std::fs` that attach path context to every failure
//! and encapsulate the handful of recurring patterns in the pipeline:
//! directory creation, recursive copies, JSON round-trips, and size
//! accounting for the final bundle report.

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Create a directory and all parents if missing.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if path.exists() {
        if !path.is_dir() {
            anyhow::bail!("Path exists but is not a directory: {}", path.display());
        }
        return Ok(());
    }
    fs::create_dir_all(path)
        .with_context(|| format!("Failed to create directory: {}", path.display()))
}

/// Create the parent directory of a file path if missing.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    Ok(())
}

/// Remove a directory tree. Missing directories are not an error.
pub fn remove_dir_if_exists(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_dir_all(path)
            .with_context(|| format!("Failed to remove directory: {}", path.display()))?;
    }
    Ok(())
}

/// Recursively copy `src` into `dst`, creating directories as needed.
/// Existing destination files are overwritten.
pub fn copy_dir_all(src: &Path, dst: &Path) -> Result<()> {
    ensure_dir(dst)?;
    for entry in fs::read_dir(src)
        .with_context(|| format!("Failed to read directory: {}", src.display()))?
    {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_all(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target).with_context(|| {
                format!("Failed to copy {} to {}", entry.path().display(), target.display())
            })?;
        }
    }
    Ok(())
}

/// Clear the read-only flag on every file under `dir`.
///
/// Some source trees are checked out read-only; files copied out of them
/// keep the flag and would break later overwrites.
pub fn force_writable(dir: &Path) -> Result<()> {
    for entry in WalkDir::new(dir).follow_links(false) {
        let entry = entry
            .with_context(|| format!("Failed to walk directory: {}", dir.display()))?;
        if entry.file_type().is_file() {
            let mut perms = entry.metadata()?.permissions();
            if perms.readonly() {
                #[allow(clippy::permissions_set_readonly_false)]
                perms.set_readonly(false);
                fs::set_permissions(entry.path(), perms).with_context(|| {
                    format!("Failed to make writable: {}", entry.path().display())
                })?;
            }
        }
    }
    Ok(())
}

/// Read a file to a string with path context.
pub fn read_text_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path.display()))
}

/// Write a string to a file, creating parent directories.
pub fn write_text_file(path: &Path, content: &str) -> Result<()> {
    ensure_parent_dir(path)?;
    fs::write(path, content).with_context(|| format!("Failed to write file: {}", path.display()))
}

/// Read and deserialize a JSON file.
pub fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = read_text_file(path)?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse JSON in: {}", path.display()))
}

/// Serialize a value to pretty-printed JSON and write it, creating parent
/// directories.
pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value)
        .with_context(|| format!("Failed to serialize JSON for: {}", path.display()))?;
    write_text_file(path, &content)
}

/// Total size in bytes of all files under `path`. Unreadable entries are
/// skipped; this feeds a log line, not a correctness decision.
#[must_use]
pub fn dir_size(path: &Path) -> u64 {
    WalkDir::new(path)
        .follow_links(false)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}

/// Compute a relative path from `base` (a directory) to `target` without
/// touching the filesystem.
///
/// Both paths are compared component-wise; shared prefixes are dropped and
/// the remainder of `base` becomes `..` hops. Used for the path literals
/// patched into the generated bundler config, so the output always uses
/// forward slashes.
#[must_use]
pub fn relative_unix_path(base: &Path, target: &Path) -> String {
    let base_components: Vec<Component> = base.components().collect();
    let target_components: Vec<Component> = target.components().collect();

    let common = base_components
        .iter()
        .zip(target_components.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<String> = Vec::new();
    for _ in common..base_components.len() {
        parts.push("..".to_string());
    }
    for component in &target_components[common..] {
        parts.push(component.as_os_str().to_string_lossy().into_owned());
    }
    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}

/// Build an absolute path from a possibly-relative one, anchored at `root`.
#[must_use]
pub fn absolutize(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() { path.to_path_buf() } else { root.join(path) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn ensure_dir_is_idempotent() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path().join("a/b/c");
        ensure_dir(&dir).unwrap();
        ensure_dir(&dir).unwrap();
        assert!(dir.is_dir());
    }

    #[test]
    fn copy_dir_all_copies_nested_files() {
        let tmp = tempdir().unwrap();
        let src = tmp.path().join("src");
        ensure_dir(&src.join("nested")).unwrap();
        fs::write(src.join("a.txt"), "a").unwrap();
        fs::write(src.join("nested/b.txt"), "b").unwrap();

        let dst = tmp.path().join("dst");
        copy_dir_all(&src, &dst).unwrap();

        assert_eq!(fs::read_to_string(dst.join("a.txt")).unwrap(), "a");
        assert_eq!(fs::read_to_string(dst.join("nested/b.txt")).unwrap(), "b");
    }

    #[test]
    fn force_writable_clears_readonly_flag() {
        let tmp = tempdir().unwrap();
        let file = tmp.path().join("ro.txt");
        fs::write(&file, "x").unwrap();
        let mut perms = fs::metadata(&file).unwrap().permissions();
        perms.set_readonly(true);
        fs::set_permissions(&file, perms).unwrap();

        force_writable(tmp.path()).unwrap();
        assert!(!fs::metadata(&file).unwrap().permissions().readonly());
    }

    #[test]
    fn dir_size_sums_files() {
        let tmp = tempdir().unwrap();
        fs::write(tmp.path().join("a"), [0u8; 10]).unwrap();
        fs::write(tmp.path().join("b"), [0u8; 5]).unwrap();
        assert_eq!(dir_size(tmp.path()), 15);
    }

    #[test]
    fn relative_unix_path_walks_up_and_down() {
        let base = Path::new("/project/build");
        let target = Path::new("/project/frontend");
        assert_eq!(relative_unix_path(base, target), "../frontend");

        let same = Path::new("/project/build");
        assert_eq!(relative_unix_path(base, same), ".");

        let below = Path::new("/project/build/frontend");
        assert_eq!(relative_unix_path(base, below), "frontend");
    }
}
