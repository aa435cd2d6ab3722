//! Shared DTOs for the validation service: match results, resource
//! metadata, paged search results and validation reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// The kind of document a validator or resource manager handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// Plain JSON, validated against a registered JSON Schema.
    PlainJson,
    /// JSON-LD / RDF, validated against a registered SHACL template.
    Rdf,
}

/// How a stored resource was matched against an input document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchKind {
    SimilarityMatch,
    NameAndVersion,
    ExactTypeMatch,
    ContextUriMatch,
    VocabularyMatch,
}

/// Result of a query searching for a validation resource.
///
/// `None` means "no suitable resource found" and carries nothing; it is not
/// an error. A successful match always carries the stored content together
/// with the name/version it was registered under.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchResult<T> {
    None,
    Match {
        name: String,
        version: String,
        resource: T,
        kind: MatchKind,
    },
}

impl<T> MatchResult<T> {
    pub fn is_none(&self) -> bool {
        matches!(self, MatchResult::None)
    }

    pub fn kind(&self) -> Option<MatchKind> {
        match self {
            MatchResult::None => None,
            MatchResult::Match { kind, .. } => Some(*kind),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> MatchResult<U> {
        match self {
            MatchResult::None => MatchResult::None,
            MatchResult::Match {
                name,
                version,
                resource,
                kind,
            } => MatchResult::Match {
                name,
                version,
                resource: f(resource),
                kind,
            },
        }
    }
}

/// Descriptive metadata of a registered validation resource.
///
/// SHACL templates additionally carry the context URI their instances
/// reference; for JSON Schemas `context_uri` is always `None`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl ResourceMetadata {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_context_uri(mut self, context_uri: impl Into<String>) -> Self {
        self.context_uri = Some(context_uri.into());
        self
    }
}

/// Search filter over registered resources. All text filters are
/// case-insensitive substring matches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    pub name: Option<String>,
    pub description: Option<String>,
    pub version: Option<String>,
    #[serde(default)]
    pub offset: usize,
    #[serde(default = "SearchQuery::default_limit")]
    pub limit: usize,
}

impl SearchQuery {
    pub const DEFAULT_LIMIT: usize = 20;

    fn default_limit() -> usize {
        Self::DEFAULT_LIMIT
    }
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            name: None,
            description: None,
            version: None,
            offset: 0,
            limit: Self::DEFAULT_LIMIT,
        }
    }
}

/// One page of search results together with the unfiltered total.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedResult<T> {
    pub total: u64,
    pub limit: usize,
    pub items: Vec<T>,
}

impl<T> PagedResult<T> {
    pub fn new(total: u64, limit: usize, items: Vec<T>) -> Self {
        Self {
            total,
            limit,
            items,
        }
    }
}

/// A single property violation inside a validation report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvalidProperty {
    pub property: String,
    pub message: String,
}

impl InvalidProperty {
    pub fn new(property: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            message: message.into(),
        }
    }
}

/// Outcome of validating an input document against a matched resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub kind: DocumentKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub invalid_properties: Vec<InvalidProperty>,
}

impl ValidationReport {
    /// Report for the case where no stored resource matched the input.
    pub fn no_match(kind: DocumentKind, message: impl Into<String>) -> Self {
        Self {
            valid: false,
            kind,
            message: Some(message.into()),
            resource_name: None,
            resource_version: None,
            invalid_properties: Vec::new(),
        }
    }

    /// Report built from the violations produced by a validation engine.
    pub fn from_violations(
        kind: DocumentKind,
        name: &str,
        version: &str,
        match_kind: MatchKind,
        invalid_properties: Vec<InvalidProperty>,
    ) -> Self {
        Self {
            valid: invalid_properties.is_empty(),
            kind,
            message: Some(format!(
                "Validation performed using template found by {match_kind}"
            )),
            resource_name: Some(name.to_string()),
            resource_version: Some(version.to_string()),
            invalid_properties,
        }
    }
}
