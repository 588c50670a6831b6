use super::reconcile::{load_required_packages, reconcile_required_packages};
use super::{DEPENDENCIES, DEV_DEPENDENCIES, ManifestDocument};
use crate::constants::{PACKAGE_HASH_KEY, SHRINKWRAP_PACKAGE};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::fs;
use tempfile::tempdir;

fn required(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
    entries.iter().map(|(n, v)| ((*n).to_string(), (*v).to_string())).collect()
}

#[test]
fn load_missing_file_yields_empty_document() {
    let tmp = tempdir().unwrap();
    let doc = ManifestDocument::load(&tmp.path().join("package.json")).unwrap();
    assert!(doc.root().is_empty());
}

#[test]
fn load_rejects_non_object_root() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("package.json");
    fs::write(&path, "[1, 2]").unwrap();
    assert!(ManifestDocument::load(&path).is_err());
}

#[test]
fn save_and_load_round_trips_structure_and_order() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("package.json");

    let mut doc = ManifestDocument::new();
    doc.set("zeta", json!("first"));
    doc.set("alpha", json!({"nested": [1, "two", true, null]}));
    doc.set("count", json!(3));
    doc.save(&path).unwrap();

    let loaded = ManifestDocument::load(&path).unwrap();
    assert_eq!(loaded, doc);
    // preserve_order keeps the authored key sequence
    let keys: Vec<&String> = loaded.root().keys().collect();
    assert_eq!(keys, ["zeta", "alpha", "count"]);
}

#[test]
fn ensure_defaults_counts_insertions_and_respects_existing() {
    let mut doc = ManifestDocument::new();
    let first = doc.ensure_defaults(false);
    assert!(first > 0);
    assert_eq!(doc.get_str("name"), Some("no-name"));
    assert!(doc.dependency_version(DEPENDENCIES, "@polymer/polymer").is_some());
    assert!(doc.dependency_version(DEV_DEPENDENCIES, "webpack").is_some());

    // Second pass inserts nothing
    assert_eq!(doc.ensure_defaults(false), 0);

    // User-authored values survive
    let mut custom = ManifestDocument::new();
    custom.set("name", json!("my-app"));
    custom.set_dependency(DEPENDENCIES, "@polymer/polymer", "3.3.0");
    custom.ensure_defaults(false);
    assert_eq!(custom.get_str("name"), Some("my-app"));
    assert_eq!(custom.dependency_version(DEPENDENCIES, "@polymer/polymer"), Some("3.3.0"));
}

#[test]
fn boolean_flag_honors_overwrite_mode() {
    let mut doc = ManifestDocument::new();
    doc.set("private", json!(false));

    // Absent-only mode leaves the user's value alone
    doc.ensure_defaults(false);
    assert_eq!(doc.root().get("private"), Some(&json!(false)));

    // Overwrite mode re-asserts the flag and counts the change
    let changed = doc.ensure_defaults(true);
    assert!(changed >= 1);
    assert_eq!(doc.root().get("private"), Some(&json!(true)));
    assert_eq!(doc.ensure_defaults(true), 0);
}

#[test]
fn merging_main_into_generated_lets_main_win() {
    let mut generated = ManifestDocument::new();
    generated.set_dependency(DEPENDENCIES, "lit-element", "^2.2.1");
    generated.set("name", json!("generated"));

    let mut main = ManifestDocument::new();
    main.set("name", json!("user-app"));
    main.set_dependency(DEPENDENCIES, "lodash", "^4.17.0");

    generated.merge_from(&main);
    assert_eq!(generated.get_str("name"), Some("user-app"));
    assert_eq!(generated.dependency_version(DEPENDENCIES, "lit-element"), Some("^2.2.1"));
    assert_eq!(generated.dependency_version(DEPENDENCIES, "lodash"), Some("^4.17.0"));
}

#[test]
fn stored_hash_updates_only_on_change() {
    let mut doc = ManifestDocument::new();
    doc.set_dependency(DEPENDENCIES, "webpack", "4.42.0");
    let hash = doc.dependencies_hash();

    assert!(doc.update_stored_hash(&hash));
    assert!(!doc.update_stored_hash(&hash));

    doc.set_dependency(DEPENDENCIES, "webpack", "4.43.0");
    let changed = doc.dependencies_hash();
    assert_ne!(hash, changed);
    assert!(doc.update_stored_hash(&changed));
    assert_eq!(doc.get_str(PACKAGE_HASH_KEY), Some(changed.as_str()));
}

#[test]
fn reconcile_adds_and_updates_required_entries() {
    let tmp = tempdir().unwrap();
    let main = ManifestDocument::new();
    let mut generated = ManifestDocument::new();
    generated.set_dependency(DEPENDENCIES, "@atrium/router", "1.0.0");

    let outcome = reconcile_required_packages(
        &mut generated,
        &required(&[("@atrium/router", "1.1.0"), ("@atrium/grid", "2.0.0")]),
        &main,
        tmp.path(),
    );
    assert!(outcome.modified);
    assert!(!outcome.do_cleanup);
    assert_eq!(generated.dependency_version(DEPENDENCIES, "@atrium/router"), Some("1.1.0"));
    assert_eq!(generated.dependency_version(DEPENDENCIES, "@atrium/grid"), Some("2.0.0"));
}

#[test]
fn reconcile_prunes_stale_dependencies() {
    let tmp = tempdir().unwrap();
    let main = ManifestDocument::new();
    let mut generated = ManifestDocument::new();
    generated.set_dependency(DEPENDENCIES, "@atrium/router", "1.0.0");
    generated.set_dependency(DEPENDENCIES, "left-behind", "0.1.0");

    let outcome = reconcile_required_packages(
        &mut generated,
        &required(&[("@atrium/router", "1.0.0")]),
        &main,
        tmp.path(),
    );
    assert!(outcome.modified);
    assert!(generated.dependency_version(DEPENDENCIES, "left-behind").is_none());
}

#[test]
fn reconcile_matching_state_reports_unmodified() {
    let tmp = tempdir().unwrap();
    let main = ManifestDocument::new();
    let mut generated = ManifestDocument::new();
    generated.set_dependency(DEPENDENCIES, "@atrium/router", "1.0.0");

    let outcome = reconcile_required_packages(
        &mut generated,
        &required(&[("@atrium/router", "1.0.0")]),
        &main,
        tmp.path(),
    );
    assert!(!outcome.modified);
    assert!(!outcome.do_cleanup);
}

#[test]
fn pin_change_signals_cleanup() {
    let tmp = tempdir().unwrap();
    let main = ManifestDocument::new();
    let mut generated = ManifestDocument::new();
    generated.set_dependency(DEPENDENCIES, SHRINKWRAP_PACKAGE, "14.1.0");

    let outcome = reconcile_required_packages(
        &mut generated,
        &required(&[(SHRINKWRAP_PACKAGE, "14.2.0")]),
        &main,
        tmp.path(),
    );
    assert!(outcome.do_cleanup);
    assert_eq!(generated.dependency_version(DEPENDENCIES, SHRINKWRAP_PACKAGE), Some("14.2.0"));
}

#[test]
fn pin_removal_signals_cleanup() {
    let tmp = tempdir().unwrap();
    let main = ManifestDocument::new();
    let mut generated = ManifestDocument::new();
    generated.set_dependency(DEPENDENCIES, SHRINKWRAP_PACKAGE, "14.1.0");

    let outcome =
        reconcile_required_packages(&mut generated, &required(&[]), &main, tmp.path());
    assert!(outcome.do_cleanup);
}

#[test]
fn absent_pin_everywhere_means_no_cleanup() {
    let tmp = tempdir().unwrap();
    let main = ManifestDocument::new();
    let mut generated = ManifestDocument::new();

    let outcome = reconcile_required_packages(
        &mut generated,
        &required(&[(SHRINKWRAP_PACKAGE, "14.2.0")]),
        &main,
        tmp.path(),
    );
    assert!(!outcome.do_cleanup);
}

#[test]
fn pin_lookup_falls_back_to_installed_package_manifest() {
    let tmp = tempdir().unwrap();
    let nested = tmp.path().join("node_modules").join(SHRINKWRAP_PACKAGE);
    fs::create_dir_all(&nested).unwrap();
    fs::write(nested.join("package.json"), r#"{"version": "14.0.5"}"#).unwrap();

    let main = ManifestDocument::new();
    let mut generated = ManifestDocument::new();
    let outcome = reconcile_required_packages(
        &mut generated,
        &required(&[(SHRINKWRAP_PACKAGE, "14.1.0")]),
        &main,
        tmp.path(),
    );
    assert!(outcome.do_cleanup);
}

#[test]
fn pin_lookup_falls_back_to_lockfile() {
    let tmp = tempdir().unwrap();
    let lock = json!({
        "dependencies": {
            SHRINKWRAP_PACKAGE: {"version": "14.0.1"}
        }
    });
    fs::write(tmp.path().join("package-lock.json"), lock.to_string()).unwrap();

    let main = ManifestDocument::new();
    let mut generated = ManifestDocument::new();
    let outcome = reconcile_required_packages(
        &mut generated,
        &required(&[(SHRINKWRAP_PACKAGE, "14.0.1")]),
        &main,
        tmp.path(),
    );
    // Lockfile agrees with the scanned version: no cleanup
    assert!(!outcome.do_cleanup);

    let outcome = reconcile_required_packages(
        &mut generated,
        &required(&[(SHRINKWRAP_PACKAGE, "14.0.2")]),
        &main,
        tmp.path(),
    );
    // Generated now carries 14.0.1 from the previous call, so the move to
    // 14.0.2 is visible without consulting the lockfile at all
    assert!(outcome.do_cleanup);
}

#[test]
fn corrupt_lockfile_is_ignored_in_pin_lookup() {
    let tmp = tempdir().unwrap();
    fs::write(tmp.path().join("package-lock.json"), "{ not json").unwrap();

    let main = ManifestDocument::new();
    let mut generated = ManifestDocument::new();
    let outcome = reconcile_required_packages(
        &mut generated,
        &required(&[(SHRINKWRAP_PACKAGE, "14.2.0")]),
        &main,
        tmp.path(),
    );
    assert!(!outcome.do_cleanup);
}

#[test]
fn required_packages_file_parses_as_map() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("required.json");
    fs::write(&path, r#"{"@atrium/grid": "2.0.0", "@atrium/router": "1.1.0"}"#).unwrap();

    let map = load_required_packages(&path).unwrap();
    assert_eq!(map.len(), 2);
    assert_eq!(map.get("@atrium/grid").map(String::as_str), Some("2.0.0"));
}

#[test]
fn document_value_kinds_survive_round_trip() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("package.json");
    let mut doc = ManifestDocument::new();
    doc.set("string", json!("s"));
    doc.set("number", json!(42));
    doc.set("float", json!(1.5));
    doc.set("bool", json!(false));
    doc.set("null", Value::Null);
    doc.set("array", json!([1, [2, 3], {"k": "v"}]));
    doc.set("object", json!({"inner": {"deep": true}}));
    doc.save(&path).unwrap();

    assert_eq!(ManifestDocument::load(&path).unwrap(), doc);
}
