//! Plain JSON validation against registered JSON Schemas.

use std::num::NonZeroUsize;
use std::sync::Arc;

use async_trait::async_trait;
use lru::LruCache;
use parking_lot::Mutex;
use serde_json::Value;

use crate::error::{Result, ValidatorError};
use crate::matcher::refine_candidates;
use crate::model::{
    DocumentKind, MatchKind, MatchResult, InvalidProperty, PagedResult, ResourceMetadata,
    SearchQuery, ValidationReport,
};
use crate::paths::extract_paths;
use crate::schema::extract_metadata;
use crate::store::SchemaStore;
use crate::validator::{Capability, ResourceManager, Validator};

const COMPILED_CACHE_CAPACITY: NonZeroUsize = NonZeroUsize::new(64).unwrap();

pub const NO_SCHEMA_SUITABLE: &str = "No schema suitable to validate the input was found";

/// Validator for [`DocumentKind::PlainJson`] documents.
///
/// Compiled schemas are cached per (name, version); registration replaces
/// nothing in place, so entries never go stale while a schema exists.
pub struct PlainJsonValidator {
    store: Arc<dyn SchemaStore>,
    compiled: Mutex<LruCache<(String, String), Arc<jsonschema::Validator>>>,
}

impl PlainJsonValidator {
    pub fn new(store: Arc<dyn SchemaStore>) -> Self {
        Self {
            store,
            compiled: Mutex::new(LruCache::new(COMPILED_CACHE_CAPACITY)),
        }
    }

    fn compile(&self, name: &str, version: &str, schema: &Value) -> Result<Arc<jsonschema::Validator>> {
        let key = (name.to_string(), version.to_string());
        if let Some(compiled) = self.compiled.lock().get(&key) {
            return Ok(Arc::clone(compiled));
        }
        let compiled = Arc::new(jsonschema::validator_for(schema).map_err(|e| {
            ValidatorError::invalid_input(format!("stored schema {name} {version} does not compile: {e}"))
        })?);
        self.compiled.lock().put(key, Arc::clone(&compiled));
        Ok(compiled)
    }

    fn run(
        &self,
        document: &Value,
        schema: &Value,
        name: &str,
        version: &str,
        kind: MatchKind,
    ) -> Result<ValidationReport> {
        crate::metrics::METRICS.record_match(kind);
        let compiled = self.compile(name, version, schema)?;
        let violations: Vec<InvalidProperty> = compiled
            .iter_errors(document)
            .map(|error| {
                InvalidProperty::new(error.instance_path.to_string(), error.to_string())
            })
            .collect();
        Ok(ValidationReport::from_violations(
            DocumentKind::PlainJson,
            name,
            version,
            kind,
            violations,
        ))
    }
}

fn parse_document(document: &str) -> Result<Value> {
    serde_json::from_str(document)
        .map_err(|e| ValidatorError::invalid_input(format!("malformed JSON document: {e}")))
}

impl Capability for PlainJsonValidator {
    fn can_handle(&self, kind: DocumentKind) -> bool {
        kind == DocumentKind::PlainJson
    }

    fn priority(&self) -> u8 {
        10
    }
}

#[async_trait]
impl Validator for PlainJsonValidator {
    async fn validate(&self, document: &str) -> Result<ValidationReport> {
        let parsed = parse_document(document)?;
        let input_paths = extract_paths(&parsed);
        let candidates = self
            .store
            .find_candidates_by_path_overlap(&input_paths)
            .await?;
        match refine_candidates(&input_paths, candidates) {
            MatchResult::None => Ok(ValidationReport::no_match(
                DocumentKind::PlainJson,
                NO_SCHEMA_SUITABLE,
            )),
            MatchResult::Match {
                name,
                version,
                resource,
                kind,
            } => self.run(&parsed, &resource, &name, &version, kind),
        }
    }

    async fn validate_named(
        &self,
        document: &str,
        name: &str,
        version: &str,
    ) -> Result<ValidationReport> {
        let parsed = parse_document(document)?;
        let schema = self.store.find_by_name_and_version(name, version).await?;
        self.run(&parsed, &schema, name, version, MatchKind::NameAndVersion)
    }
}

/// Resource manager for registered JSON Schemas.
pub struct JsonSchemaManager {
    store: Arc<dyn SchemaStore>,
}

impl JsonSchemaManager {
    pub fn new(store: Arc<dyn SchemaStore>) -> Self {
        Self { store }
    }
}

impl Capability for JsonSchemaManager {
    fn can_handle(&self, kind: DocumentKind) -> bool {
        kind == DocumentKind::PlainJson
    }

    fn priority(&self) -> u8 {
        10
    }
}

#[async_trait]
impl ResourceManager for JsonSchemaManager {
    async fn add(&self, meta: ResourceMetadata, content: &str) -> Result<i64> {
        let schema: Value = serde_json::from_str(content)
            .map_err(|e| ValidatorError::invalid_input(format!("malformed JSON Schema: {e}")))?;
        // Reject schemas the validation engine cannot compile instead of
        // failing later at match time.
        jsonschema::validator_for(&schema)
            .map_err(|e| ValidatorError::invalid_input(format!("invalid JSON Schema: {e}")))?;
        let derived = extract_metadata(&schema);
        let id = self.store.insert(meta, derived, schema).await?;
        tracing::info!(id, "registered JSON Schema");
        Ok(id)
    }

    async fn delete(&self, id: i64) -> Result<()> {
        self.store.delete(id).await
    }

    async fn find_by_id(&self, id: i64) -> Result<(ResourceMetadata, String)> {
        let (meta, content) = self.store.find_by_id(id).await?;
        Ok((meta, content.to_string()))
    }

    async fn find_by_name_and_version(&self, name: &str, version: &str) -> Result<String> {
        Ok(self
            .store
            .find_by_name_and_version(name, version)
            .await?
            .to_string())
    }

    async fn search(&self, query: &SearchQuery) -> Result<PagedResult<ResourceMetadata>> {
        self.store.search(query).await
    }
}
