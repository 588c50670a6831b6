//! The token file consumed by the asset-serving runtime.
//!
//! A flat JSON file describing how this build was prepared: dev or
//! production mode, feature flags, and (dev only) the directories the dev
//! server needs to find. Dev and prod variants are written to different
//! names and must never coexist (a stale copy of the other variant would
//! make the runtime misdetect the mode), so both are deleted at the start
//! of every run before the current one is written.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::{POLYMER_VERSION, TOKEN_FILE_DEV, TOKEN_FILE_PROD};
use crate::utils::fs::write_json_file;

/// Build-mode token handed to the runtime launcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenFile {
    /// Always false; the compatibility pipeline is gone but the runtime
    /// still reads the flag
    #[serde(rename = "compatibilityMode")]
    pub compatibility_mode: bool,
    #[serde(rename = "productionMode")]
    pub production_mode: bool,
    #[serde(rename = "polymer.version")]
    pub polymer_version: String,
    #[serde(rename = "enablePnpm")]
    pub enable_pnpm: bool,
    #[serde(rename = "enableDevServer")]
    pub enable_dev_server: bool,
    pub debug: bool,
    #[serde(rename = "npmFolder", skip_serializing_if = "Option::is_none")]
    pub npm_folder: Option<PathBuf>,
    #[serde(rename = "generatedFolder", skip_serializing_if = "Option::is_none")]
    pub generated_folder: Option<PathBuf>,
    #[serde(rename = "frontendFolder", skip_serializing_if = "Option::is_none")]
    pub frontend_folder: Option<PathBuf>,
    #[serde(rename = "extractJar", skip_serializing_if = "Option::is_none")]
    pub extract_jar: Option<bool>,
}

impl TokenFile {
    /// A dev-mode token carrying the directories the dev server resolves.
    #[must_use]
    pub fn dev(
        enable_pnpm: bool,
        debug: bool,
        npm_folder: PathBuf,
        generated_folder: PathBuf,
        frontend_folder: PathBuf,
    ) -> Self {
        Self {
            compatibility_mode: false,
            production_mode: false,
            polymer_version: POLYMER_VERSION.to_string(),
            enable_pnpm,
            enable_dev_server: true,
            debug,
            npm_folder: Some(npm_folder),
            generated_folder: Some(generated_folder),
            frontend_folder: Some(frontend_folder),
            extract_jar: None,
        }
    }

    /// A production token; paths are omitted because assets are packaged.
    #[must_use]
    pub fn production(enable_pnpm: bool, debug: bool) -> Self {
        Self {
            compatibility_mode: false,
            production_mode: true,
            polymer_version: POLYMER_VERSION.to_string(),
            enable_pnpm,
            enable_dev_server: false,
            debug,
            npm_folder: None,
            generated_folder: None,
            frontend_folder: None,
            extract_jar: Some(true),
        }
    }
}

/// Delete both token variants. Run before every pipeline pass.
pub fn remove_stale_tokens(build_dir: &Path) -> Result<()> {
    for name in [TOKEN_FILE_DEV, TOKEN_FILE_PROD] {
        let path = build_dir.join(name);
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove stale token: {}", path.display()))?;
        }
    }
    Ok(())
}

/// Write the token under the name matching its mode. Returns the path.
pub fn write_token(build_dir: &Path, token: &TokenFile) -> Result<PathBuf> {
    let name = if token.production_mode { TOKEN_FILE_PROD } else { TOKEN_FILE_DEV };
    let path = build_dir.join(name);
    write_json_file(&path, token)?;
    tracing::debug!(target: "bundler", "Wrote token file {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use tempfile::tempdir;

    #[test]
    fn dev_token_serializes_flat_keys() {
        let token = TokenFile::dev(
            true,
            false,
            PathBuf::from("/p/build"),
            PathBuf::from("/p/build/frontend"),
            PathBuf::from("/p/frontend"),
        );
        let value: Value = serde_json::to_value(&token).unwrap();
        assert_eq!(value["compatibilityMode"], Value::Bool(false));
        assert_eq!(value["productionMode"], Value::Bool(false));
        assert_eq!(value["enablePnpm"], Value::Bool(true));
        assert_eq!(value["enableDevServer"], Value::Bool(true));
        assert_eq!(value["polymer.version"], Value::String(POLYMER_VERSION.to_string()));
        assert!(value.get("npmFolder").is_some());
        assert!(value.get("extractJar").is_none());
    }

    #[test]
    fn production_token_omits_dev_paths() {
        let token = TokenFile::production(false, true);
        let value: Value = serde_json::to_value(&token).unwrap();
        assert_eq!(value["productionMode"], Value::Bool(true));
        assert_eq!(value["enableDevServer"], Value::Bool(false));
        assert_eq!(value["extractJar"], Value::Bool(true));
        assert!(value.get("npmFolder").is_none());
        assert!(value.get("frontendFolder").is_none());
    }

    #[test]
    fn variants_are_mutually_exclusive_on_disk() {
        let tmp = tempdir().unwrap();

        let dev = TokenFile::dev(
            false,
            false,
            tmp.path().to_path_buf(),
            tmp.path().join("g"),
            tmp.path().join("f"),
        );
        write_token(tmp.path(), &dev).unwrap();
        assert!(tmp.path().join(TOKEN_FILE_DEV).exists());

        // A later production run clears the dev variant first
        remove_stale_tokens(tmp.path()).unwrap();
        write_token(tmp.path(), &TokenFile::production(false, false)).unwrap();
        assert!(!tmp.path().join(TOKEN_FILE_DEV).exists());
        assert!(tmp.path().join(TOKEN_FILE_PROD).exists());
    }
}
