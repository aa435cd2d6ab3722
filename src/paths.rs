//! Structural path extraction from JSON trees.
//!
//! A path is a dotted address into the document: object keys join with `.`,
//! array steps append `[]`. Paths are collected as a set, so order and
//! duplicates are irrelevant. Extraction is pure and deterministic; it has
//! no failure modes.

use std::collections::HashSet;

use serde_json::Value;

/// Extract every structural path from a JSON document.
///
/// Arrays are assumed structurally homogeneous: only the first element is
/// descended into, and only when it is itself an object or array. `null`
/// nodes and scalars contribute no paths beyond their own key.
pub fn extract_paths(node: &Value) -> HashSet<String> {
    collect(node, "")
}

fn collect(node: &Value, current: &str) -> HashSet<String> {
    let mut paths = HashSet::new();
    match node {
        Value::Object(fields) => {
            if !current.is_empty() {
                paths.insert(current.to_string());
            }
            for (key, value) in fields {
                let full = join(current, key);
                paths.insert(full.clone());
                paths.extend(collect(value, &full));
            }
        }
        Value::Array(items) => {
            let array_path = format!("{current}[]");
            paths.insert(array_path.clone());
            if let Some(first) = items.first()
                && (first.is_object() || first.is_array())
            {
                paths.extend(collect(first, &array_path));
            }
        }
        _ => {}
    }
    paths
}

/// Join a parent path and a key segment with a dot, unless the parent is
/// the root.
pub fn join(current: &str, key: &str) -> String {
    if current.is_empty() {
        key.to_string()
    } else {
        format!("{current}.{key}")
    }
}
