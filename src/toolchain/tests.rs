use super::*;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

#[cfg(unix)]
fn write_version_script(path: &Path, version: &str) {
    use std::os::unix::fs::PermissionsExt;
    fs::write(path, format!("#!/bin/sh\necho {version}\n")).unwrap();
    let mut perms = fs::metadata(path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).unwrap();
}

/// A toolchain root whose node/npm are stub scripts reporting the given
/// versions.
#[cfg(unix)]
fn fake_install(root: &Path, node_version: &str, npm_version: &str) {
    let bin = root.join(NODE_INSTALL_DIR).join("bin");
    fs::create_dir_all(&bin).unwrap();
    write_version_script(&bin.join("node"), node_version);
    write_version_script(&bin.join("npm"), npm_version);
}

#[tokio::test]
async fn probe_existing_rejects_missing_install() {
    let tmp = tempdir().unwrap();
    assert!(probe_existing(&tmp.path().join("node")).await.is_none());
}

#[cfg(unix)]
#[tokio::test]
async fn probe_existing_accepts_satisfactory_versions() {
    let tmp = tempdir().unwrap();
    fake_install(tmp.path(), "v18.16.0", "9.5.1");

    let versions = probe_existing(&tmp.path().join(NODE_INSTALL_DIR)).await.unwrap();
    assert_eq!(versions.0, semver::Version::new(18, 16, 0));
    assert_eq!(versions.1, semver::Version::new(9, 5, 1));
}

#[cfg(unix)]
#[tokio::test]
async fn probe_existing_rejects_stale_node() {
    let tmp = tempdir().unwrap();
    fake_install(tmp.path(), "v8.11.0", "9.5.1");
    assert!(probe_existing(&tmp.path().join(NODE_INSTALL_DIR)).await.is_none());
}

#[cfg(unix)]
#[tokio::test]
async fn probe_existing_rejects_stale_npm() {
    let tmp = tempdir().unwrap();
    fake_install(tmp.path(), "v18.16.0", "5.5.0");
    assert!(probe_existing(&tmp.path().join(NODE_INSTALL_DIR)).await.is_none());
}

#[cfg(unix)]
#[tokio::test]
async fn ensure_toolchain_is_idempotent_for_satisfied_install() {
    let tmp = tempdir().unwrap();
    fake_install(tmp.path(), "v18.16.0", "9.5.1");

    // An unreachable download root proves nothing is fetched when the
    // existing install already satisfies the minimums.
    let options = ToolchainOptions {
        node_version: "18.16.0".to_string(),
        toolchain_root: tmp.path().to_path_buf(),
        download_root: "http://127.0.0.1:1/unreachable/".to_string(),
        want_pnpm: false,
        pnpm_version: crate::constants::DEFAULT_PNPM_VERSION.to_string(),
    };

    let first = ensure_toolchain(&options).await.unwrap();
    let second = ensure_toolchain(&options).await.unwrap();
    assert_eq!(first.node_version, second.node_version);
    assert!(!second.pnpm_enabled);
    assert!(second.node_binary.ends_with("bin/node"));
}

#[cfg(unix)]
#[tokio::test]
async fn package_manager_prefers_enabled_pnpm() {
    let tmp = tempdir().unwrap();
    fake_install(tmp.path(), "v18.16.0", "9.5.1");
    let install_dir = tmp.path().join(NODE_INSTALL_DIR);

    let mut state = ToolchainState {
        node_version: semver::Version::new(18, 16, 0),
        npm_version: semver::Version::new(9, 5, 1),
        node_binary: platform::node_executable(&install_dir),
        npm_binary: platform::npm_executable(&install_dir),
        install_dir,
        pnpm_binary: Some(tmp.path().join("node_modules/.bin/pnpm")),
        pnpm_enabled: true,
    };
    assert!(state.package_manager().ends_with("pnpm"));

    state.pnpm_enabled = false;
    assert!(state.package_manager().ends_with("npm"));
}
