//! Deep merge of one manifest document into another.
//!
//! The merge dispatches on the five JSON value kinds rather than delegating
//! to a generic merge utility, because arrays need index-addressed
//! rebuilding: the destination array keeps its identity and any elements
//! past the source's length, while overlapping indices merge element by
//! element. A wholesale list overwrite would drop destination-only tail
//! entries and break nested-object merging inside arrays.
//!
//! Used to fold the user-owned main manifest into the generated one; the
//! invariant is that keys present in the source always override or merge
//! into the destination.

use serde_json::{Map, Value};

use super::ManifestDocument;

impl ManifestDocument {
    /// Merge `source` into `self`. Source keys win; objects and arrays
    /// merge recursively, scalars overwrite.
    pub fn merge_from(&mut self, source: &ManifestDocument) {
        merge_objects(self.root_mut(), source.root());
    }
}

/// Merge every key of `source` into `dest` following the kind-dispatch
/// rules.
pub fn merge_objects(dest: &mut Map<String, Value>, source: &Map<String, Value>) {
    for (key, source_value) in source {
        match dest.get_mut(key) {
            Some(dest_value) => merge_value(dest_value, source_value),
            None => {
                dest.insert(key.clone(), source_value.clone());
            }
        }
    }
}

fn merge_value(dest: &mut Value, source: &Value) {
    match (dest, source) {
        (Value::Object(dest_map), Value::Object(source_map)) => {
            merge_objects(dest_map, source_map);
        }
        (Value::Array(dest_arr), Value::Array(source_arr)) => {
            merge_arrays(dest_arr, source_arr);
        }
        // Kind mismatch or scalar: the source value overwrites.
        (dest_slot, source_value) => {
            *dest_slot = source_value.clone();
        }
    }
}

/// Rebuild `dest` element by element from `source`, preserving any
/// destination elements beyond the source length.
pub fn merge_arrays(dest: &mut Vec<Value>, source: &[Value]) {
    for (index, source_value) in source.iter().enumerate() {
        if index < dest.len() {
            merge_value(&mut dest[index], source_value);
        } else {
            dest.push(source_value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("fixture must be an object"),
        }
    }

    #[test]
    fn scalars_overwrite_unconditionally() {
        let mut dest = obj(json!({"a": 1, "b": "keep"}));
        let source = obj(json!({"a": 2}));
        merge_objects(&mut dest, &source);
        assert_eq!(dest["a"], json!(2));
        assert_eq!(dest["b"], json!("keep"));
    }

    #[test]
    fn objects_merge_recursively() {
        let mut dest = obj(json!({"scripts": {"build": "webpack", "test": "jest"}}));
        let source = obj(json!({"scripts": {"build": "webpack --mode production"}}));
        merge_objects(&mut dest, &source);
        assert_eq!(dest["scripts"]["build"], json!("webpack --mode production"));
        assert_eq!(dest["scripts"]["test"], json!("jest"));
    }

    #[test]
    fn missing_destination_object_is_created() {
        let mut dest = obj(json!({}));
        let source = obj(json!({"dependencies": {"lit-element": "^2.2.1"}}));
        merge_objects(&mut dest, &source);
        assert_eq!(dest["dependencies"]["lit-element"], json!("^2.2.1"));
    }

    #[test]
    fn arrays_rebuild_by_index_and_keep_tail() {
        let mut dest = obj(json!({"files": ["a.js", "b.js", "c.js"]}));
        let source = obj(json!({"files": ["x.js"]}));
        merge_objects(&mut dest, &source);
        assert_eq!(dest["files"], json!(["x.js", "b.js", "c.js"]));
    }

    #[test]
    fn array_elements_merge_with_type_dispatch() {
        let mut dest = obj(json!({"entries": [{"name": "main", "lazy": true}]}));
        let source = obj(json!({"entries": [{"name": "index"}, {"name": "extra"}]}));
        merge_objects(&mut dest, &source);
        assert_eq!(dest["entries"][0], json!({"name": "index", "lazy": true}));
        assert_eq!(dest["entries"][1], json!({"name": "extra"}));
    }

    #[test]
    fn kind_mismatch_overwrites() {
        let mut dest = obj(json!({"value": {"nested": true}}));
        let source = obj(json!({"value": "flat"}));
        merge_objects(&mut dest, &source);
        assert_eq!(dest["value"], json!("flat"));
    }

    #[test]
    fn null_overwrites_like_a_scalar() {
        let mut dest = obj(json!({"value": 7}));
        let source = obj(json!({"value": null}));
        merge_objects(&mut dest, &source);
        assert_eq!(dest["value"], Value::Null);
    }

    #[test]
    fn merge_is_idempotent() {
        let mut dest = obj(json!({
            "name": "app",
            "dependencies": {"a": "1.0.0"},
            "files": [{"keep": 1}, "tail"]
        }));
        let source = obj(json!({
            "name": "app-renamed",
            "dependencies": {"b": "2.0.0"},
            "files": [{"keep": 2}]
        }));
        merge_objects(&mut dest, &source);
        let once = dest.clone();
        merge_objects(&mut dest, &source);
        assert_eq!(dest, once);
    }
}
