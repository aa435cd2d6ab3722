//! JSON Schema structural fingerprints.
//!
//! A stored schema is reduced at registration time to the compact metadata
//! the similarity matcher scores against: its required paths, oneOf/anyOf
//! variants and pattern properties. The metadata is derived solely from the
//! schema content and recomputed on every registration.

mod metadata;

pub use metadata::extract_metadata;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Fingerprint of a JSON Schema's required structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaMetadata {
    /// Dotted paths of every required property, recursively.
    pub required_paths: HashSet<String>,
    pub has_variants: bool,
    pub variants: Vec<SchemaVariant>,
    pub pattern_properties: Vec<PatternProperty>,
}

/// Which combinator a variant came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VariantKind {
    OneOf,
    AnyOf,
}

/// One alternative of a polymorphic (`oneOf`/`anyOf`) schema.
///
/// `required_paths` holds only the paths local to this alternative; the
/// parent schema's paths are not merged in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaVariant {
    pub kind: VariantKind,
    pub index: usize,
    pub required_paths: HashSet<String>,
    pub discriminator_path: Option<String>,
    pub discriminator_value: Option<String>,
}

/// A property keyed by a regular expression instead of a literal name.
///
/// `required_sub_paths` is non-empty only when the pattern's value schema is
/// itself an object; its paths are relative to the matched property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternProperty {
    pub pattern_regex: String,
    /// Literal prefix of the regex, prefixed with the path of the schema
    /// node that declared it. Advisory: the matcher compiles the full regex.
    pub path_prefix: String,
    pub required_sub_paths: Vec<String>,
}
