use super::*;
use tempfile::tempdir;

const HASH: &str = "0f9c3a";

fn write_marker_file(build_dir: &Path, hash: &str) {
    let path = marker_path(build_dir);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, format!("{{\"hash\": \"{hash}\"}}")).unwrap();
}

#[test]
fn missing_node_modules_always_installs() {
    let tmp = tempdir().unwrap();
    write_marker_file(tmp.path(), HASH);
    assert!(should_run_install(tmp.path(), HASH, false));
}

#[test]
fn node_modules_with_only_ignored_folders_always_installs() {
    let tmp = tempdir().unwrap();
    write_marker_file(tmp.path(), HASH);
    for name in IGNORED_NODE_FOLDERS {
        fs::create_dir_all(tmp.path().join("node_modules").join(name)).unwrap();
    }
    assert!(should_run_install(tmp.path(), HASH, false));
}

#[test]
fn populated_dir_with_matching_hash_skips() {
    let tmp = tempdir().unwrap();
    write_marker_file(tmp.path(), HASH);
    fs::create_dir_all(tmp.path().join("node_modules/.bin")).unwrap();
    fs::create_dir_all(tmp.path().join("node_modules/lit-element")).unwrap();
    assert!(!should_run_install(tmp.path(), HASH, false));
}

#[test]
fn hash_mismatch_installs() {
    let tmp = tempdir().unwrap();
    write_marker_file(tmp.path(), "stale");
    fs::create_dir_all(tmp.path().join("node_modules/lit-element")).unwrap();
    assert!(should_run_install(tmp.path(), HASH, false));
}

#[test]
fn modified_manifest_installs_even_when_state_matches() {
    let tmp = tempdir().unwrap();
    write_marker_file(tmp.path(), HASH);
    fs::create_dir_all(tmp.path().join("node_modules/lit-element")).unwrap();
    assert!(should_run_install(tmp.path(), HASH, true));
}

#[test]
fn missing_marker_installs() {
    let tmp = tempdir().unwrap();
    fs::create_dir_all(tmp.path().join("node_modules/lit-element")).unwrap();
    assert!(should_run_install(tmp.path(), HASH, false));
}

#[test]
fn corrupt_marker_is_treated_as_absent() {
    let tmp = tempdir().unwrap();
    let path = marker_path(tmp.path());
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, "{ truncated").unwrap();
    fs::create_dir_all(tmp.path().join("node_modules/lit-element")).unwrap();

    assert_eq!(stored_marker_hash(tmp.path()), None);
    assert!(should_run_install(tmp.path(), HASH, false));
}

#[test]
fn force_cleanup_removes_lockfile_and_node_modules() {
    let tmp = tempdir().unwrap();
    fs::write(tmp.path().join(PACKAGE_LOCK_JSON), "{}").unwrap();
    fs::create_dir_all(tmp.path().join("node_modules/lit-element")).unwrap();

    force_cleanup(tmp.path()).unwrap();
    assert!(!tmp.path().join(PACKAGE_LOCK_JSON).exists());
    assert!(!tmp.path().join("node_modules").exists());
}

#[test]
fn force_cleanup_tolerates_clean_state() {
    let tmp = tempdir().unwrap();
    force_cleanup(tmp.path()).unwrap();
}

#[test]
fn pnpm_hook_file_is_regenerated() {
    let tmp = tempdir().unwrap();
    write_pnpm_hooks(tmp.path()).unwrap();
    let content = fs::read_to_string(tmp.path().join(PNPM_HOOK_FILE)).unwrap();
    assert!(content.contains("readPackage"));
}

#[test]
fn marker_round_trips_through_write() {
    let tmp = tempdir().unwrap();
    write_marker(tmp.path(), HASH).unwrap();
    assert_eq!(stored_marker_hash(tmp.path()).as_deref(), Some(HASH));
}
