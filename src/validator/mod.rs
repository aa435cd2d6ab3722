//! Validation strategies and their capability registry.
//!
//! Each document kind is served by a validator (runs documents against
//! matched resources) and a resource manager (registers and serves the
//! resources themselves). Both are selected at request time by capability
//! and priority.

mod json;
mod semantic;

pub use json::{JsonSchemaManager, PlainJsonValidator};
pub use semantic::{SemanticValidator, ShaclTemplateManager};

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{Result, ValidatorError};
use crate::model::{
    DocumentKind, PagedResult, ResourceMetadata, SearchQuery, ValidationReport,
};

/// Capability declaration shared by validators and resource managers.
pub trait Capability {
    fn can_handle(&self, kind: DocumentKind) -> bool;

    /// Selection preference among capable strategies, lower wins.
    fn priority(&self) -> u8 {
        100
    }
}

/// Validates input documents of the kinds it declares.
#[async_trait]
pub trait Validator: Capability + Send + Sync {
    /// Validate against the best-matching stored resource.
    async fn validate(&self, document: &str) -> Result<ValidationReport>;

    /// Validate against an explicitly named resource.
    async fn validate_named(
        &self,
        document: &str,
        name: &str,
        version: &str,
    ) -> Result<ValidationReport>;
}

/// Manages stored validation resources of the kinds it declares.
#[async_trait]
pub trait ResourceManager: Capability + Send + Sync {
    async fn add(&self, meta: ResourceMetadata, content: &str) -> Result<i64>;

    async fn delete(&self, id: i64) -> Result<()>;

    async fn find_by_id(&self, id: i64) -> Result<(ResourceMetadata, String)>;

    async fn find_by_name_and_version(&self, name: &str, version: &str) -> Result<String>;

    async fn search(&self, query: &SearchQuery) -> Result<PagedResult<ResourceMetadata>>;
}

/// Static registry of capability-tagged strategies.
pub struct Registry<T: ?Sized> {
    role: &'static str,
    entries: Vec<Arc<T>>,
}

impl<T: Capability + ?Sized> Registry<T> {
    pub fn new(role: &'static str, entries: Vec<Arc<T>>) -> Self {
        Self { role, entries }
    }

    /// Pick the lowest-priority strategy declaring the kind.
    pub fn select(&self, kind: DocumentKind) -> Result<Arc<T>> {
        self.entries
            .iter()
            .filter(|e| e.can_handle(kind))
            .min_by_key(|e| e.priority())
            .cloned()
            .ok_or(ValidatorError::Configuration {
                role: self.role,
                kind,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Probe {
        kind: DocumentKind,
        priority: u8,
        label: &'static str,
    }

    impl Capability for Probe {
        fn can_handle(&self, kind: DocumentKind) -> bool {
            self.kind == kind
        }

        fn priority(&self) -> u8 {
            self.priority
        }
    }

    #[test]
    fn lowest_priority_capable_entry_wins() {
        let registry = Registry::new(
            "validator",
            vec![
                Arc::new(Probe {
                    kind: DocumentKind::PlainJson,
                    priority: 50,
                    label: "fallback",
                }),
                Arc::new(Probe {
                    kind: DocumentKind::PlainJson,
                    priority: 10,
                    label: "preferred",
                }),
            ],
        );
        let selected = registry.select(DocumentKind::PlainJson).unwrap();
        assert_eq!(selected.label, "preferred");
    }

    #[test]
    fn unhandled_kind_is_a_configuration_error() {
        let registry: Registry<Probe> = Registry::new("validator", Vec::new());
        let error = registry.select(DocumentKind::Rdf).unwrap_err();
        assert!(matches!(error, ValidatorError::Configuration { .. }));
    }
}
