//! Metadata extraction from JSON Schema documents.
//!
//! Missing or malformed nodes never fail extraction; absent keys simply
//! contribute nothing. `allOf` branches are merged into the same metadata:
//! all of them contribute to one shape. `oneOf`/`anyOf` become scoped
//! variants instead.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde_json::Value;

use super::{PatternProperty, SchemaMetadata, SchemaVariant, VariantKind};
use crate::paths::join;

const REQUIRED: &str = "required";
const PROPERTIES: &str = "properties";
const PATTERN_PROPERTIES: &str = "patternProperties";
const TYPE: &str = "type";
const ITEMS: &str = "items";
const ALL_OF: &str = "allOf";
const ONE_OF: &str = "oneOf";
const ANY_OF: &str = "anyOf";
const CONST: &str = "const";
const ENUM: &str = "enum";
const DISCRIMINATOR: &str = "discriminator";
const PROPERTY_NAME: &str = "propertyName";
const OBJECT: &str = "object";
const ARRAY: &str = "array";

/// Reduce a JSON Schema to its structural fingerprint.
pub fn extract_metadata(schema: &Value) -> SchemaMetadata {
    let mut metadata = SchemaMetadata::default();
    handle_schema(schema, &mut metadata);
    metadata
}

fn handle_schema(schema: &Value, metadata: &mut SchemaMetadata) {
    metadata
        .required_paths
        .extend(extract_required_paths(schema, ""));
    metadata
        .pattern_properties
        .extend(extract_pattern_properties(schema, ""));
    if let Some(branches) = schema.get(ALL_OF).and_then(Value::as_array) {
        tracing::debug!(branches = branches.len(), "merging allOf branches");
        for branch in branches {
            handle_schema(branch, metadata);
        }
    }
    if let Some(variants) = schema.get(ONE_OF).and_then(Value::as_array) {
        metadata
            .variants
            .extend(extract_variants(variants, VariantKind::OneOf, schema));
        metadata.has_variants = true;
    }
    if let Some(variants) = schema.get(ANY_OF).and_then(Value::as_array) {
        metadata
            .variants
            .extend(extract_variants(variants, VariantKind::AnyOf, schema));
        metadata.has_variants = true;
    }
}

/// Collect `<currentPath>.<name>` for every `required` entry, recursing
/// into object-typed properties and object-typed array items.
fn extract_required_paths(schema: &Value, current: &str) -> HashSet<String> {
    let mut paths = HashSet::new();
    let Some(obj) = schema.as_object() else {
        return paths;
    };

    let properties = obj.get(PROPERTIES);
    if let Some(required) = obj.get(REQUIRED).and_then(Value::as_array) {
        for name in required.iter().filter_map(Value::as_str) {
            let full = join(current, name);
            paths.insert(full.clone());
            if let Some(prop_schema) = properties.and_then(|p| p.get(name)) {
                paths.extend(recurse_into_property(prop_schema, &full));
            }
        }
    }
    paths
}

fn recurse_into_property(prop_schema: &Value, full_path: &str) -> HashSet<String> {
    let mut paths = HashSet::new();
    match prop_schema.get(TYPE).and_then(Value::as_str) {
        Some(OBJECT) => {
            paths.extend(extract_required_paths(prop_schema, full_path));
            if prop_schema.get(PATTERN_PROPERTIES).is_some() {
                // sentinel path marking "some dynamic children required here"
                paths.insert(format!("{full_path}.<pattern>"));
            }
        }
        Some(ARRAY) => {
            if let Some(items) = prop_schema.get(ITEMS).filter(|i| i.is_object())
                && items.get(TYPE).and_then(Value::as_str) == Some(OBJECT)
            {
                paths.extend(extract_required_paths(items, &format!("{full_path}[]")));
            }
        }
        _ => {}
    }
    paths
}

fn extract_variants(
    variants_node: &[Value],
    kind: VariantKind,
    parent_schema: &Value,
) -> Vec<SchemaVariant> {
    let discriminator = detect_discriminator(variants_node, parent_schema);

    variants_node
        .iter()
        .enumerate()
        .map(|(index, variant_schema)| SchemaVariant {
            kind,
            index,
            required_paths: extract_required_paths(variant_schema, ""),
            discriminator_path: discriminator.clone(),
            discriminator_value: discriminator
                .as_deref()
                .and_then(|path| extract_discriminator_value(variant_schema, path)),
        })
        .collect()
}

/// Find the property that tells variants apart.
///
/// An explicit `discriminator.propertyName` on the parent wins. Otherwise
/// every variant's direct properties are scanned for a field pinned to a
/// single value via `const` or a one-element `enum`; the first field (in
/// insertion order) whose distinct values exactly cover the variant count is
/// adopted. No candidate is not an error; the fields just stay unset.
fn detect_discriminator(variants_node: &[Value], parent_schema: &Value) -> Option<String> {
    if let Some(name) = parent_schema
        .get(DISCRIMINATOR)
        .and_then(|d| d.get(PROPERTY_NAME))
        .and_then(Value::as_str)
    {
        tracing::debug!(discriminator = name, "explicit discriminator declared");
        return Some(name.to_string());
    }

    let mut candidates: IndexMap<String, HashSet<String>> = IndexMap::new();
    for variant in variants_node {
        let Some(props) = variant.get(PROPERTIES).and_then(Value::as_object) else {
            continue;
        };
        for (field, field_schema) in props {
            if let Some(value) = pinned_value(field_schema) {
                candidates.entry(field.clone()).or_default().insert(value);
            }
        }
    }

    candidates
        .into_iter()
        .find(|(_, values)| values.len() == variants_node.len())
        .map(|(field, _)| field)
}

/// The single value a field schema is pinned to, if any.
fn pinned_value(field_schema: &Value) -> Option<String> {
    if let Some(value) = field_schema.get(CONST) {
        return Some(as_text(value));
    }
    if let Some(values) = field_schema.get(ENUM).and_then(Value::as_array)
        && values.len() == 1
    {
        return Some(as_text(&values[0]));
    }
    None
}

fn extract_discriminator_value(variant_schema: &Value, discriminator_path: &str) -> Option<String> {
    variant_schema
        .get(PROPERTIES)
        .and_then(|props| props.get(discriminator_path))
        .and_then(pinned_value)
}

fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn extract_pattern_properties(schema: &Value, current: &str) -> Vec<PatternProperty> {
    let mut patterns = Vec::new();
    let Some(obj) = schema.as_object() else {
        return patterns;
    };

    if let Some(pattern_props) = obj.get(PATTERN_PROPERTIES).and_then(Value::as_object) {
        for (pattern, pattern_schema) in pattern_props {
            patterns.push(build_pattern_property(pattern, pattern_schema, current));
        }
    }

    if let Some(props) = obj.get(PROPERTIES).and_then(Value::as_object) {
        for (name, prop_schema) in props {
            patterns.extend(extract_pattern_properties(prop_schema, &join(current, name)));
        }
    }

    patterns
}

fn build_pattern_property(pattern: &str, pattern_schema: &Value, current: &str) -> PatternProperty {
    let extracted = literal_prefix(pattern);
    let path_prefix = if extracted.is_empty() {
        current.to_string()
    } else {
        join(current, &extracted)
    };

    let mut required_sub_paths = Vec::new();
    if pattern_schema.get(TYPE).and_then(Value::as_str) == Some(OBJECT) {
        required_sub_paths = extract_required_paths(pattern_schema, "")
            .into_iter()
            .collect();
        required_sub_paths.sort();
    }

    PatternProperty {
        pattern_regex: pattern.to_string(),
        path_prefix,
        required_sub_paths,
    }
}

/// Literal prefix of a regex: everything up to the first unescaped
/// metacharacter, with a leading `^` anchor stripped.
///
/// The reference implementation computed this prefix and then discarded it,
/// always yielding an empty string; here the computed value is kept. The
/// prefix is advisory only, so match outcomes are unaffected either way.
fn literal_prefix(pattern_regex: &str) -> String {
    let pattern = pattern_regex.strip_prefix('^').unwrap_or(pattern_regex);
    let bytes = pattern.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'[' | b'(' | b'.' | b'*' | b'+' | b'?' | b'{' | b'|' | b'$' => break,
            b'\\' if i + 1 < bytes.len() => i += 2,
            _ => i += 1,
        }
    }
    pattern[..i].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path_set(paths: &[&str]) -> HashSet<String> {
        paths.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn required_paths_recurse_into_object_properties() {
        let schema = json!({
            "type": "object",
            "required": ["a", "b"],
            "properties": {
                "a": {
                    "type": "object",
                    "required": ["c"],
                    "properties": { "c": { "type": "string" } }
                },
                "b": { "type": "string" }
            }
        });
        let metadata = extract_metadata(&schema);
        assert_eq!(metadata.required_paths, path_set(&["a", "a.c", "b"]));
        assert!(!metadata.has_variants);
    }

    #[test]
    fn required_paths_recurse_into_object_array_items() {
        let schema = json!({
            "required": ["parts"],
            "properties": {
                "parts": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "required": ["code"],
                        "properties": { "code": { "type": "string" } }
                    }
                }
            }
        });
        let metadata = extract_metadata(&schema);
        assert_eq!(metadata.required_paths, path_set(&["parts", "parts[].code"]));
    }

    #[test]
    fn scalar_array_items_do_not_recurse() {
        let schema = json!({
            "required": ["tags"],
            "properties": {
                "tags": { "type": "array", "items": { "type": "string" } }
            }
        });
        let metadata = extract_metadata(&schema);
        assert_eq!(metadata.required_paths, path_set(&["tags"]));
    }

    #[test]
    fn all_of_branches_merge_into_one_shape() {
        let schema = json!({
            "allOf": [
                { "required": ["a"] },
                { "required": ["b"], "properties": { "b": { "type": "string" } } }
            ],
            "required": ["c"]
        });
        let metadata = extract_metadata(&schema);
        assert_eq!(metadata.required_paths, path_set(&["a", "b", "c"]));
        assert!(!metadata.has_variants);
    }

    #[test]
    fn pattern_properties_add_a_sentinel_under_required_objects() {
        let schema = json!({
            "required": ["attrs"],
            "properties": {
                "attrs": {
                    "type": "object",
                    "patternProperties": { "^x-": { "type": "string" } }
                }
            }
        });
        let metadata = extract_metadata(&schema);
        assert!(metadata.required_paths.contains("attrs.<pattern>"));
    }

    #[test]
    fn variants_keep_only_local_required_paths() {
        let schema = json!({
            "required": ["shared"],
            "oneOf": [
                { "required": ["first"] },
                { "required": ["second"] }
            ]
        });
        let metadata = extract_metadata(&schema);
        assert!(metadata.has_variants);
        assert_eq!(metadata.variants.len(), 2);
        assert_eq!(metadata.variants[0].required_paths, path_set(&["first"]));
        assert_eq!(metadata.variants[1].required_paths, path_set(&["second"]));
        assert_eq!(metadata.variants[0].kind, VariantKind::OneOf);
        assert_eq!(metadata.variants[1].index, 1);
    }

    #[test]
    fn discriminator_inferred_from_const_values() {
        let schema = json!({
            "oneOf": [
                {
                    "required": ["kind"],
                    "properties": { "kind": { "const": "X" } }
                },
                {
                    "required": ["kind"],
                    "properties": { "kind": { "const": "Y" } }
                }
            ]
        });
        let metadata = extract_metadata(&schema);
        let [first, second] = metadata.variants.as_slice() else {
            panic!("expected two variants");
        };
        assert_eq!(first.discriminator_path.as_deref(), Some("kind"));
        assert_eq!(first.discriminator_value.as_deref(), Some("X"));
        assert_eq!(second.discriminator_path.as_deref(), Some("kind"));
        assert_eq!(second.discriminator_value.as_deref(), Some("Y"));
    }

    #[test]
    fn discriminator_inferred_from_single_element_enums() {
        let schema = json!({
            "anyOf": [
                { "properties": { "format": { "enum": ["csv"] } } },
                { "properties": { "format": { "enum": ["xml"] } } }
            ]
        });
        let metadata = extract_metadata(&schema);
        assert_eq!(
            metadata.variants[0].discriminator_path.as_deref(),
            Some("format")
        );
        assert_eq!(
            metadata.variants[1].discriminator_value.as_deref(),
            Some("xml")
        );
    }

    #[test]
    fn no_discriminator_when_values_do_not_cover_variants() {
        // Both variants pin `kind` to the same value: one distinct value
        // for two variants cannot discriminate.
        let schema = json!({
            "oneOf": [
                { "properties": { "kind": { "const": "same" } } },
                { "properties": { "kind": { "const": "same" } } }
            ]
        });
        let metadata = extract_metadata(&schema);
        assert!(metadata.variants[0].discriminator_path.is_none());
        assert!(metadata.variants[0].discriminator_value.is_none());
    }

    #[test]
    fn explicit_discriminator_wins_over_inference() {
        let schema = json!({
            "discriminator": { "propertyName": "selector" },
            "oneOf": [
                { "properties": { "selector": { "const": "a" }, "kind": { "const": "X" } } },
                { "properties": { "selector": { "const": "b" }, "kind": { "const": "Y" } } }
            ]
        });
        let metadata = extract_metadata(&schema);
        assert_eq!(
            metadata.variants[0].discriminator_path.as_deref(),
            Some("selector")
        );
        assert_eq!(
            metadata.variants[1].discriminator_value.as_deref(),
            Some("b")
        );
    }

    #[test]
    fn pattern_property_collects_required_subpaths_for_object_values() {
        let schema = json!({
            "patternProperties": {
                "^ext-": {
                    "type": "object",
                    "required": ["unit", "value"]
                },
                "^meta[0-9]+$": { "type": "string" }
            }
        });
        let metadata = extract_metadata(&schema);
        assert_eq!(metadata.pattern_properties.len(), 2);
        let object_valued = metadata
            .pattern_properties
            .iter()
            .find(|p| p.pattern_regex == "^ext-")
            .unwrap();
        assert_eq!(object_valued.required_sub_paths, vec!["unit", "value"]);
        let scalar_valued = metadata
            .pattern_properties
            .iter()
            .find(|p| p.pattern_regex == "^meta[0-9]+$")
            .unwrap();
        assert!(scalar_valued.required_sub_paths.is_empty());
    }

    #[test]
    fn pattern_properties_found_under_nested_properties() {
        let schema = json!({
            "properties": {
                "specs": {
                    "patternProperties": { "^dim-": { "type": "number" } }
                }
            }
        });
        let metadata = extract_metadata(&schema);
        assert_eq!(metadata.pattern_properties.len(), 1);
        assert_eq!(metadata.pattern_properties[0].path_prefix, "specs.dim-");
    }

    // The reference implementation dropped the computed prefix and always
    // stored "". That is corrected here: the literal prefix survives.
    #[test]
    fn pattern_prefix_is_kept_not_discarded() {
        assert_eq!(literal_prefix("^ext-[a-z]+"), "ext-");
        assert_eq!(literal_prefix("prefix.*"), "prefix");
        assert_eq!(literal_prefix("^[0-9]+"), "");
        assert_eq!(literal_prefix(r"^a\.b\*c"), r"a\.b\*c");
        assert_eq!(literal_prefix("plain"), "plain");
    }

    #[test]
    fn malformed_nodes_yield_empty_metadata() {
        assert_eq!(extract_metadata(&json!("not a schema")), SchemaMetadata::default());
        assert_eq!(extract_metadata(&json!(null)), SchemaMetadata::default());
        let metadata = extract_metadata(&json!({ "required": "not-an-array" }));
        assert!(metadata.required_paths.is_empty());
    }
}
