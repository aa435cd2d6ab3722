//! RDF document validation against registered SHACL templates.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{Result, ValidatorError};
use crate::graph::{GraphEngine, ShapeViolation};
use crate::jsonld::extract_input_metadata;
use crate::model::{
    DocumentKind, InvalidProperty, MatchKind, MatchResult, PagedResult, ResourceMetadata,
    SearchQuery, ValidationReport,
};
use crate::shacl::extract_shape_metadata;
use crate::store::TemplateStore;
use crate::validator::{Capability, ResourceManager, Validator};

pub const NO_TEMPLATE_SUITABLE: &str = "No template suitable to validate the input was found";

/// Validator for [`DocumentKind::Rdf`] documents.
pub struct SemanticValidator {
    templates: Arc<dyn TemplateStore>,
    engine: Arc<dyn GraphEngine>,
}

impl SemanticValidator {
    pub fn new(templates: Arc<dyn TemplateStore>, engine: Arc<dyn GraphEngine>) -> Self {
        Self { templates, engine }
    }

    fn run(
        &self,
        document: &str,
        template: &str,
        name: &str,
        version: &str,
        kind: MatchKind,
    ) -> Result<ValidationReport> {
        crate::metrics::METRICS.record_match(kind);
        let report = self.engine.evaluate_shapes(template, document)?;
        let violations = report
            .violations
            .into_iter()
            .map(invalid_property)
            .collect();
        Ok(ValidationReport::from_violations(
            DocumentKind::Rdf,
            name,
            version,
            kind,
            violations,
        ))
    }
}

/// Violations compose focus node and path into the property identifier,
/// with `N/A` standing in for whichever part the engine did not report.
fn invalid_property(violation: ShapeViolation) -> InvalidProperty {
    let focus = violation.focus_node.as_deref().unwrap_or("N/A");
    let path = violation.path.as_deref().unwrap_or("N/A");
    InvalidProperty::new(format!("[{focus}]{path}"), violation.message)
}

impl Capability for SemanticValidator {
    fn can_handle(&self, kind: DocumentKind) -> bool {
        kind == DocumentKind::Rdf
    }

    fn priority(&self) -> u8 {
        10
    }
}

#[async_trait]
impl Validator for SemanticValidator {
    async fn validate(&self, document: &str) -> Result<ValidationReport> {
        let metadata = extract_input_metadata(self.engine.as_ref(), document)?;
        tracing::debug!(?metadata, "extracted input metadata");
        match self.templates.find_tier_match(&metadata).await? {
            MatchResult::None => Err(ValidatorError::not_found(NO_TEMPLATE_SUITABLE)),
            MatchResult::Match {
                name,
                version,
                resource,
                kind,
            } => self.run(document, &resource, &name, &version, kind),
        }
    }

    async fn validate_named(
        &self,
        document: &str,
        name: &str,
        version: &str,
    ) -> Result<ValidationReport> {
        let template = self
            .templates
            .find_by_name_and_version(name, version)
            .await?;
        self.run(document, &template, name, version, MatchKind::NameAndVersion)
    }
}

/// Resource manager for registered SHACL templates.
pub struct ShaclTemplateManager {
    templates: Arc<dyn TemplateStore>,
}

impl ShaclTemplateManager {
    pub fn new(templates: Arc<dyn TemplateStore>) -> Self {
        Self { templates }
    }
}

impl Capability for ShaclTemplateManager {
    fn can_handle(&self, kind: DocumentKind) -> bool {
        kind == DocumentKind::Rdf
    }

    fn priority(&self) -> u8 {
        10
    }
}

#[async_trait]
impl ResourceManager for ShaclTemplateManager {
    async fn add(&self, meta: ResourceMetadata, content: &str) -> Result<i64> {
        let shapes = extract_shape_metadata(content)?;
        let id = self
            .templates
            .insert(meta, shapes, content.to_string())
            .await?;
        tracing::info!(id, "registered SHACL template");
        Ok(id)
    }

    async fn delete(&self, id: i64) -> Result<()> {
        self.templates.delete(id).await
    }

    async fn find_by_id(&self, id: i64) -> Result<(ResourceMetadata, String)> {
        self.templates.find_by_id(id).await
    }

    async fn find_by_name_and_version(&self, name: &str, version: &str) -> Result<String> {
        self.templates.find_by_name_and_version(name, version).await
    }

    async fn search(&self, query: &SearchQuery) -> Result<PagedResult<ResourceMetadata>> {
        self.templates.search(query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::OxigraphEngine;
    use crate::store::MemoryTemplateStore;

    const TEMPLATE: &str = r#"
        @prefix sh: <http://www.w3.org/ns/shacl#> .
        @prefix veh: <https://example.org/vehicle#> .

        veh:VehicleShape a sh:NodeShape ;
            sh:targetClass veh:Vehicle ;
            sh:property [ sh:path veh:vin ; sh:minCount 1 ] .
    "#;

    fn vehicle_doc(body: &str) -> String {
        format!(
            r#"{{
                "@context": {{ "@vocab": "https://example.org/vehicle#" }},
                "@type": "Vehicle"{body}
            }}"#
        )
    }

    async fn setup() -> (SemanticValidator, ShaclTemplateManager) {
        let store = Arc::new(MemoryTemplateStore::new());
        let engine = Arc::new(OxigraphEngine::new());
        let manager = ShaclTemplateManager::new(Arc::clone(&store) as Arc<dyn TemplateStore>);
        manager
            .add(ResourceMetadata::new("vehicle", "1.0.0"), TEMPLATE)
            .await
            .unwrap();
        (
            SemanticValidator::new(store as Arc<dyn TemplateStore>, engine),
            manager,
        )
    }

    #[tokio::test]
    async fn conforming_document_matches_by_exact_type() {
        let (validator, _) = setup().await;
        let report = validator
            .validate(&vehicle_doc(r#", "vin": "WVWZZZ1JZXW000001""#))
            .await
            .unwrap();
        assert!(report.valid);
        assert_eq!(
            report.message.as_deref(),
            Some("Validation performed using template found by EXACT_TYPE_MATCH")
        );
    }

    #[tokio::test]
    async fn violations_carry_focus_node_and_path() {
        let (validator, _) = setup().await;
        let report = validator.validate(&vehicle_doc("")).await.unwrap();
        assert!(!report.valid);
        assert_eq!(report.invalid_properties.len(), 1);
        assert!(
            report.invalid_properties[0]
                .property
                .ends_with("https://example.org/vehicle#vin")
        );
    }

    #[tokio::test]
    async fn unmatched_document_is_a_not_found_error() {
        let (validator, _) = setup().await;
        let doc = r#"{
            "@context": { "@vocab": "https://example.org/other#" },
            "@type": "Other",
            "field": "value"
        }"#;
        let error = validator.validate(doc).await.unwrap_err();
        let ValidatorError::NotFound(message) = error else {
            panic!("expected NotFound");
        };
        assert_eq!(message, NO_TEMPLATE_SUITABLE);
    }

    #[tokio::test]
    async fn document_without_mapped_terms_is_a_not_found_error() {
        let (validator, _) = setup().await;
        let error = validator
            .validate(r#"{"note": "plain JSON, no context"}"#)
            .await
            .unwrap_err();
        let ValidatorError::NotFound(message) = error else {
            panic!("expected NotFound");
        };
        assert_eq!(message, NO_TEMPLATE_SUITABLE);
    }

    #[tokio::test]
    async fn unparsable_template_is_rejected_at_registration() {
        let (_, manager) = setup().await;
        let error = manager
            .add(ResourceMetadata::new("broken", "1.0.0"), "not turtle @@@")
            .await
            .unwrap_err();
        assert!(matches!(error, ValidatorError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn named_validation_uses_the_requested_template() {
        let (validator, _) = setup().await;
        let report = validator
            .validate_named(
                &vehicle_doc(r#", "vin": "WVWZZZ1JZXW000001""#),
                "vehicle",
                "1.0.0",
            )
            .await
            .unwrap();
        assert!(report.valid);
        assert_eq!(
            report.message.as_deref(),
            Some("Validation performed using template found by NAME_AND_VERSION")
        );
    }
}
