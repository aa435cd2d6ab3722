//! Facade over the validator and resource-manager registries.
//!
//! All request handlers go through [`ValidatorService`]; it selects the
//! strategy for the requested document kind, delegates, and records the
//! outcome metrics.

use std::sync::Arc;
use std::time::Instant;

use crate::error::Result;
use crate::metrics::METRICS;
use crate::model::{
    DocumentKind, PagedResult, ResourceMetadata, SearchQuery, ValidationReport,
};
use crate::validator::{Registry, ResourceManager, Validator};

pub struct ValidatorService {
    validators: Registry<dyn Validator>,
    managers: Registry<dyn ResourceManager>,
}

impl ValidatorService {
    pub fn new(
        validators: Vec<Arc<dyn Validator>>,
        managers: Vec<Arc<dyn ResourceManager>>,
    ) -> Self {
        Self {
            validators: Registry::new("validator", validators),
            managers: Registry::new("resource manager", managers),
        }
    }

    /// Validate a document against the best-matching stored resource.
    pub async fn validate(&self, kind: DocumentKind, document: &str) -> Result<ValidationReport> {
        let validator = self.validators.select(kind)?;
        let start = Instant::now();
        let result = validator.validate(document).await;
        record_outcome(kind, &result, start);
        result
    }

    /// Validate a document against an explicitly named stored resource.
    pub async fn validate_named(
        &self,
        kind: DocumentKind,
        document: &str,
        name: &str,
        version: &str,
    ) -> Result<ValidationReport> {
        let validator = self.validators.select(kind)?;
        let start = Instant::now();
        let result = validator.validate_named(document, name, version).await;
        record_outcome(kind, &result, start);
        result
    }

    pub async fn add_resource(
        &self,
        kind: DocumentKind,
        meta: ResourceMetadata,
        content: &str,
    ) -> Result<i64> {
        let id = self.managers.select(kind)?.add(meta, content).await?;
        METRICS.record_registration(kind);
        Ok(id)
    }

    pub async fn delete_resource(&self, kind: DocumentKind, id: i64) -> Result<()> {
        self.managers.select(kind)?.delete(id).await
    }

    pub async fn resource_by_id(
        &self,
        kind: DocumentKind,
        id: i64,
    ) -> Result<(ResourceMetadata, String)> {
        self.managers.select(kind)?.find_by_id(id).await
    }

    pub async fn resource_by_name_and_version(
        &self,
        kind: DocumentKind,
        name: &str,
        version: &str,
    ) -> Result<String> {
        self.managers
            .select(kind)?
            .find_by_name_and_version(name, version)
            .await
    }

    pub async fn search(
        &self,
        kind: DocumentKind,
        query: &SearchQuery,
    ) -> Result<PagedResult<ResourceMetadata>> {
        self.managers.select(kind)?.search(query).await
    }
}

fn record_outcome(kind: DocumentKind, result: &Result<ValidationReport>, start: Instant) {
    let outcome = match result {
        Ok(report) if report.valid => "valid",
        Ok(report) if report.resource_name.is_none() => "no_match",
        Ok(_) => "invalid",
        Err(_) => "error",
    };
    METRICS.record_validation(kind, outcome, start.elapsed());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidatorError;
    use crate::graph::OxigraphEngine;
    use crate::store::{MemorySchemaStore, MemoryTemplateStore, SchemaStore, TemplateStore};
    use crate::validator::{
        JsonSchemaManager, PlainJsonValidator, SemanticValidator, ShaclTemplateManager,
    };
    use serde_json::json;

    fn full_service() -> ValidatorService {
        let schemas: Arc<dyn SchemaStore> = Arc::new(MemorySchemaStore::new());
        let templates: Arc<dyn TemplateStore> = Arc::new(MemoryTemplateStore::new());
        let engine = Arc::new(OxigraphEngine::new());
        ValidatorService::new(
            vec![
                Arc::new(PlainJsonValidator::new(Arc::clone(&schemas))),
                Arc::new(SemanticValidator::new(Arc::clone(&templates), engine)),
            ],
            vec![
                Arc::new(JsonSchemaManager::new(schemas)),
                Arc::new(ShaclTemplateManager::new(templates)),
            ],
        )
    }

    #[tokio::test]
    async fn registered_schema_is_found_by_similarity() {
        let service = full_service();
        service
            .add_resource(
                DocumentKind::PlainJson,
                ResourceMetadata::new("vehicle", "1.0.0"),
                &json!({
                    "type": "object",
                    "required": ["vin"],
                    "properties": { "vin": { "type": "string" } }
                })
                .to_string(),
            )
            .await
            .unwrap();

        let report = service
            .validate(DocumentKind::PlainJson, r#"{"vin": "WVWZZZ1JZXW000001"}"#)
            .await
            .unwrap();
        assert!(report.valid);
        assert_eq!(report.resource_name.as_deref(), Some("vehicle"));
    }

    #[tokio::test]
    async fn unregistered_kind_is_a_configuration_error() {
        let service = ValidatorService::new(Vec::new(), Vec::new());
        let error = service
            .validate(DocumentKind::Rdf, "{}")
            .await
            .unwrap_err();
        assert!(matches!(error, ValidatorError::Configuration { .. }));
    }

    #[tokio::test]
    async fn resource_lifecycle_round_trip() {
        let service = full_service();
        let id = service
            .add_resource(
                DocumentKind::PlainJson,
                ResourceMetadata::new("battery", "2.0.0"),
                r#"{"type": "object", "required": ["capacity"]}"#,
            )
            .await
            .unwrap();

        let (meta, _) = service
            .resource_by_id(DocumentKind::PlainJson, id)
            .await
            .unwrap();
        assert_eq!(meta.name, "battery");

        service
            .delete_resource(DocumentKind::PlainJson, id)
            .await
            .unwrap();
        let error = service
            .resource_by_id(DocumentKind::PlainJson, id)
            .await
            .unwrap_err();
        assert!(matches!(error, ValidatorError::NotFound(_)));
    }

    #[tokio::test]
    async fn search_is_scoped_to_the_requested_kind() {
        let service = full_service();
        service
            .add_resource(
                DocumentKind::PlainJson,
                ResourceMetadata::new("vehicle", "1.0.0"),
                r#"{"type": "object", "required": ["vin"]}"#,
            )
            .await
            .unwrap();

        let templates = service
            .search(DocumentKind::Rdf, &SearchQuery::default())
            .await
            .unwrap();
        assert_eq!(templates.total, 0);

        let schemas = service
            .search(DocumentKind::PlainJson, &SearchQuery::default())
            .await
            .unwrap();
        assert_eq!(schemas.total, 1);
    }
}
