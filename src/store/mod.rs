//! Storage traits for registered validation resources.
//!
//! Two independent tables: JSON Schemas for plain JSON documents and SHACL
//! templates for RDF documents. Both are keyed by id and by the unique
//! (name, version) pair. The matching queries live here because they run
//! over the derived metadata the store indexes at registration time.

mod memory;

pub use memory::{MemorySchemaStore, MemoryTemplateStore};

use std::collections::HashSet;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::jsonld::InputMetadata;
use crate::matcher::SchemaCandidate;
use crate::model::{MatchResult, PagedResult, ResourceMetadata, SearchQuery};
use crate::schema::SchemaMetadata;
use crate::shacl::ShapeMetadata;

/// Storage and matching queries over registered JSON Schemas.
#[async_trait]
pub trait SchemaStore: Send + Sync {
    /// Register a schema together with its derived matching metadata.
    /// Fails with `InvalidInput` when the (name, version) pair or the
    /// content digest is already registered.
    async fn insert(
        &self,
        meta: ResourceMetadata,
        derived: SchemaMetadata,
        content: Value,
    ) -> Result<i64>;

    /// Exact lookup, `NotFound` when no such pair exists.
    async fn find_by_name_and_version(&self, name: &str, version: &str) -> Result<Value>;

    async fn find_by_id(&self, id: i64) -> Result<(ResourceMetadata, Value)>;

    async fn delete(&self, id: i64) -> Result<()>;

    async fn search(&self, query: &SearchQuery) -> Result<PagedResult<ResourceMetadata>>;

    /// Preliminary similarity phase: score every stored schema against the
    /// input paths and return the survivors ranked best first.
    async fn find_candidates_by_path_overlap(
        &self,
        input_paths: &HashSet<String>,
    ) -> Result<Vec<SchemaCandidate>>;
}

/// Storage and matching queries over registered SHACL templates.
#[async_trait]
pub trait TemplateStore: Send + Sync {
    /// Register a template together with its extracted shape metadata.
    /// Fails with `InvalidInput` when the (name, version) pair or the
    /// content digest is already registered.
    async fn insert(
        &self,
        meta: ResourceMetadata,
        shapes: Vec<ShapeMetadata>,
        content: String,
    ) -> Result<i64>;

    /// Exact lookup, `NotFound` when no such pair exists.
    async fn find_by_name_and_version(&self, name: &str, version: &str) -> Result<String>;

    async fn find_by_id(&self, id: i64) -> Result<(ResourceMetadata, String)>;

    async fn delete(&self, id: i64) -> Result<()>;

    async fn search(&self, query: &SearchQuery) -> Result<PagedResult<ResourceMetadata>>;

    /// Ranked tier lookup over the indexed shape metadata.
    async fn find_tier_match(&self, input: &InputMetadata) -> Result<MatchResult<String>>;
}
