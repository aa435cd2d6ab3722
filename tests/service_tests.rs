//! Full service wiring: both document kinds, resource lifecycle, search.

use std::sync::Arc;

use dpp_validator::ValidatorService;
use dpp_validator::error::ValidatorError;
use dpp_validator::graph::OxigraphEngine;
use dpp_validator::model::{DocumentKind, ResourceMetadata, SearchQuery};
use dpp_validator::store::{MemorySchemaStore, MemoryTemplateStore, SchemaStore, TemplateStore};
use dpp_validator::validator::{
    JsonSchemaManager, PlainJsonValidator, SemanticValidator, ShaclTemplateManager,
};

const VEHICLE_SCHEMA: &str = include_str!("../fixtures/vehicle.schema.json");
const VEHICLE_SHAPES: &str = include_str!("../fixtures/vehicle-shapes.ttl");
const VEHICLE_DOC: &str = include_str!("../fixtures/vehicle.jsonld");
const VEHICLE_DOC_MISSING_VIN: &str = include_str!("../fixtures/vehicle-missing-vin.jsonld");

fn service() -> ValidatorService {
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

async fn seeded_service() -> ValidatorService {
    let service = service();
    service
        .add_resource(
            DocumentKind::PlainJson,
            ResourceMetadata::new("vehicle", "1.0.0").with_description("vehicle passport schema"),
            VEHICLE_SCHEMA,
        )
        .await
        .unwrap();
    service
        .add_resource(
            DocumentKind::Rdf,
            ResourceMetadata::new("vehicle-template", "1.0.0")
                .with_context_uri("https://example.org/vehicle-context.jsonld"),
            VEHICLE_SHAPES,
        )
        .await
        .unwrap();
    service
}

#[tokio::test]
async fn rdf_document_is_validated_by_exact_type_match() {
    let service = seeded_service().await;
    let report = service
        .validate(DocumentKind::Rdf, VEHICLE_DOC)
        .await
        .unwrap();
    assert!(report.valid, "violations: {:?}", report.invalid_properties);
    assert_eq!(report.kind, DocumentKind::Rdf);
    assert_eq!(
        report.message.as_deref(),
        Some("Validation performed using template found by EXACT_TYPE_MATCH")
    );
}

#[tokio::test]
async fn rdf_violations_name_the_constrained_path() {
    let service = seeded_service().await;
    let report = service
        .validate(DocumentKind::Rdf, VEHICLE_DOC_MISSING_VIN)
        .await
        .unwrap();
    assert!(!report.valid);
    assert!(
        report
            .invalid_properties
            .iter()
            .any(|p| p.property.contains("https://example.org/vehicle#vin"))
    );
}

#[tokio::test]
async fn rdf_document_without_a_suitable_template_is_not_found() {
    let service = seeded_service().await;
    let document = r#"{
        "@context": { "@vocab": "https://example.org/furniture#" },
        "@type": "Chair",
        "legs": 4
    }"#;
    let error = service
        .validate(DocumentKind::Rdf, document)
        .await
        .unwrap_err();
    let ValidatorError::NotFound(message) = error else {
        panic!("expected NotFound, got {error:?}");
    };
    assert_eq!(message, "No template suitable to validate the input was found");
}

#[tokio::test]
async fn named_template_validation_reports_name_and_version() {
    let service = seeded_service().await;
    let report = service
        .validate_named(DocumentKind::Rdf, VEHICLE_DOC, "vehicle-template", "1.0.0")
        .await
        .unwrap();
    assert!(report.valid);
    assert_eq!(
        report.message.as_deref(),
        Some("Validation performed using template found by NAME_AND_VERSION")
    );

    let error = service
        .validate_named(DocumentKind::Rdf, VEHICLE_DOC, "vehicle-template", "9.9.9")
        .await
        .unwrap_err();
    assert_eq!(
        error.to_string(),
        "No template found with name vehicle-template and version 9.9.9"
    );
}

#[tokio::test]
async fn plain_json_and_rdf_resources_are_independent() {
    let service = seeded_service().await;

    let schemas = service
        .search(DocumentKind::PlainJson, &SearchQuery::default())
        .await
        .unwrap();
    assert_eq!(schemas.total, 1);
    assert_eq!(schemas.items[0].name, "vehicle");

    let templates = service
        .search(DocumentKind::Rdf, &SearchQuery::default())
        .await
        .unwrap();
    assert_eq!(templates.total, 1);
    assert_eq!(templates.items[0].name, "vehicle-template");
}

#[tokio::test]
async fn search_filters_by_description_case_insensitively() {
    let service = seeded_service().await;
    let query = SearchQuery {
        description: Some("PASSPORT".to_string()),
        ..SearchQuery::default()
    };
    let result = service
        .search(DocumentKind::PlainJson, &query)
        .await
        .unwrap();
    assert_eq!(result.total, 1);

    let query = SearchQuery {
        description: Some("furniture".to_string()),
        ..SearchQuery::default()
    };
    let result = service
        .search(DocumentKind::PlainJson, &query)
        .await
        .unwrap();
    assert_eq!(result.total, 0);
}

#[tokio::test]
async fn deleting_a_template_disables_matching_against_it() {
    let service = seeded_service().await;
    let page = service
        .search(DocumentKind::Rdf, &SearchQuery::default())
        .await
        .unwrap();
    let id = page.items[0].id.unwrap();

    service.delete_resource(DocumentKind::Rdf, id).await.unwrap();

    let error = service
        .validate(DocumentKind::Rdf, VEHICLE_DOC)
        .await
        .unwrap_err();
    assert!(matches!(error, ValidatorError::NotFound(_)));
}

#[tokio::test]
async fn template_content_round_trips_through_the_resource_api() {
    let service = seeded_service().await;
    let content = service
        .resource_by_name_and_version(DocumentKind::Rdf, "vehicle-template", "1.0.0")
        .await
        .unwrap();
    assert_eq!(content, VEHICLE_SHAPES);
}
