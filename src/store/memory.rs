//! In-memory store implementations.
//!
//! Rows live in a `parking_lot::RwLock`ed table; matching queries take a
//! read guard only, so concurrent matches never contend with each other.

use std::collections::HashSet;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::{Result, ValidatorError};
use crate::jsonld::InputMetadata;
use crate::matcher::{
    CANDIDATE_LIMIT, PRELIMINARY_THRESHOLD, SchemaCandidate, UNMATCHED_INPUT_DAMPING,
};
use crate::model::{MatchKind, MatchResult, PagedResult, ResourceMetadata, SearchQuery};
use crate::schema::SchemaMetadata;
use crate::shacl::ShapeMetadata;
use crate::store::{SchemaStore, TemplateStore};

fn digest_of(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}

fn contains_ignore_case(haystack: Option<&str>, needle: &str) -> bool {
    haystack
        .map(|h| h.to_uppercase().contains(&needle.to_uppercase()))
        .unwrap_or(false)
}

fn matches_query(meta: &ResourceMetadata, query: &SearchQuery) -> bool {
    if let Some(name) = &query.name {
        if !contains_ignore_case(Some(&meta.name), name) {
            return false;
        }
    }
    if let Some(description) = &query.description {
        if !contains_ignore_case(meta.description.as_deref(), description) {
            return false;
        }
    }
    if let Some(version) = &query.version {
        if !contains_ignore_case(Some(&meta.version), version) {
            return false;
        }
    }
    true
}

fn page<R>(
    rows: impl Iterator<Item = R>,
    query: &SearchQuery,
    meta_of: impl Fn(&R) -> &ResourceMetadata,
) -> PagedResult<ResourceMetadata> {
    let mut filtered: Vec<R> = rows.collect();
    filtered.sort_by(|a, b| {
        let (a, b) = (meta_of(a), meta_of(b));
        a.name.cmp(&b.name).then_with(|| a.version.cmp(&b.version))
    });
    let total = filtered.len() as u64;
    let items = filtered
        .into_iter()
        .skip(query.offset)
        .take(query.limit)
        .map(|r| meta_of(&r).clone())
        .collect();
    PagedResult::new(total, query.limit, items)
}

// ---------------------------------------------------------------------------
// JSON Schemas
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct SchemaRow {
    id: i64,
    meta: ResourceMetadata,
    derived: SchemaMetadata,
    content: Value,
    digest: String,
}

#[derive(Debug, Default)]
struct SchemaTable {
    next_id: i64,
    rows: Vec<SchemaRow>,
}

/// [`SchemaStore`] over a locked in-process table.
#[derive(Debug, Default)]
pub struct MemorySchemaStore {
    inner: RwLock<SchemaTable>,
}

impl MemorySchemaStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SchemaStore for MemorySchemaStore {
    async fn insert(
        &self,
        mut meta: ResourceMetadata,
        derived: SchemaMetadata,
        content: Value,
    ) -> Result<i64> {
        let digest = digest_of(content.to_string().as_bytes());
        let mut table = self.inner.write();
        if table
            .rows
            .iter()
            .any(|r| r.meta.name == meta.name && r.meta.version == meta.version)
        {
            return Err(ValidatorError::invalid_input(format!(
                "schema {} version {} is already registered",
                meta.name, meta.version
            )));
        }
        if table.rows.iter().any(|r| r.digest == digest) {
            return Err(ValidatorError::invalid_input(
                "identical schema content is already registered",
            ));
        }
        table.next_id += 1;
        let id = table.next_id;
        meta.id = Some(id);
        meta.created_at.get_or_insert_with(chrono::Utc::now);
        table.rows.push(SchemaRow {
            id,
            meta,
            derived,
            content,
            digest,
        });
        Ok(id)
    }

    async fn find_by_name_and_version(&self, name: &str, version: &str) -> Result<Value> {
        self.inner
            .read()
            .rows
            .iter()
            .find(|r| r.meta.name == name && r.meta.version == version)
            .map(|r| r.content.clone())
            .ok_or_else(|| {
                ValidatorError::not_found(format!(
                    "No schema found with name {name} and version {version}"
                ))
            })
    }

    async fn find_by_id(&self, id: i64) -> Result<(ResourceMetadata, Value)> {
        self.inner
            .read()
            .rows
            .iter()
            .find(|r| r.id == id)
            .map(|r| (r.meta.clone(), r.content.clone()))
            .ok_or_else(|| ValidatorError::not_found(format!("No schema found with id {id}")))
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let mut table = self.inner.write();
        let before = table.rows.len();
        table.rows.retain(|r| r.id != id);
        if table.rows.len() == before {
            return Err(ValidatorError::not_found(format!(
                "No schema found with id {id}"
            )));
        }
        Ok(())
    }

    async fn search(&self, query: &SearchQuery) -> Result<PagedResult<ResourceMetadata>> {
        let table = self.inner.read();
        Ok(page(
            table
                .rows
                .iter()
                .filter(|r| matches_query(&r.meta, query))
                .cloned(),
            query,
            |r: &SchemaRow| &r.meta,
        ))
    }

    async fn find_candidates_by_path_overlap(
        &self,
        input_paths: &HashSet<String>,
    ) -> Result<Vec<SchemaCandidate>> {
        let table = self.inner.read();
        let input_count = input_paths.len();

        let mut candidates = Vec::new();
        for row in &table.rows {
            let matched = row
                .derived
                .required_paths
                .intersection(input_paths)
                .count();
            let required = row.derived.required_paths.len();
            let score = preliminary_score(
                matched,
                required,
                input_count,
                &row.derived,
                input_paths,
            );
            if score < PRELIMINARY_THRESHOLD {
                continue;
            }
            candidates.push(SchemaCandidate {
                id: row.id,
                name: row.meta.name.clone(),
                version: row.meta.version.clone(),
                content: row.content.clone(),
                preliminary_score: score,
                matched_count: matched,
                required_path_count: required,
                pattern_properties: row.derived.pattern_properties.clone(),
            });
        }

        candidates.sort_by(|a, b| {
            b.preliminary_score
                .partial_cmp(&a.preliminary_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        candidates.truncate(CANDIDATE_LIMIT);
        Ok(candidates)
    }
}

/// Base score over the schema's required paths, improved by its best
/// variant. Variant scores impose the full unmatched-input penalty, while
/// the base score damps it.
fn preliminary_score(
    matched: usize,
    required: usize,
    input_count: usize,
    derived: &SchemaMetadata,
    input_paths: &HashSet<String>,
) -> f64 {
    let base = if required > 0 {
        matched as f64
            / (required as f64 + UNMATCHED_INPUT_DAMPING * (input_count as f64 - matched as f64))
    } else {
        0.0
    };

    let best_variant = derived
        .variants
        .iter()
        .filter(|v| !v.required_paths.is_empty())
        .map(|v| {
            let vmatched = v.required_paths.intersection(input_paths).count();
            let vrequired = v.required_paths.len();
            vmatched as f64 / (vrequired as f64 + input_count as f64 - vmatched as f64)
        })
        .fold(0.0_f64, f64::max);

    base.max(best_variant)
}

// ---------------------------------------------------------------------------
// SHACL templates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct TemplateRow {
    id: i64,
    meta: ResourceMetadata,
    shapes: Vec<ShapeMetadata>,
    content: String,
    digest: String,
}

#[derive(Debug, Default)]
struct TemplateTable {
    next_id: i64,
    rows: Vec<TemplateRow>,
}

/// [`TemplateStore`] over a locked in-process table.
#[derive(Debug, Default)]
pub struct MemoryTemplateStore {
    inner: RwLock<TemplateTable>,
}

impl MemoryTemplateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

const EXACT_TYPE_SCORE: f64 = 1.0;
const CONTEXT_URI_SCORE: f64 = 0.9;
const VOCABULARY_SCORE: f64 = 0.8;

#[async_trait]
impl TemplateStore for MemoryTemplateStore {
    async fn insert(
        &self,
        mut meta: ResourceMetadata,
        shapes: Vec<ShapeMetadata>,
        content: String,
    ) -> Result<i64> {
        let digest = digest_of(content.as_bytes());
        let mut table = self.inner.write();
        if table
            .rows
            .iter()
            .any(|r| r.meta.name == meta.name && r.meta.version == meta.version)
        {
            return Err(ValidatorError::invalid_input(format!(
                "template {} version {} is already registered",
                meta.name, meta.version
            )));
        }
        if table.rows.iter().any(|r| r.digest == digest) {
            return Err(ValidatorError::invalid_input(
                "identical template content is already registered",
            ));
        }
        table.next_id += 1;
        let id = table.next_id;
        meta.id = Some(id);
        meta.created_at.get_or_insert_with(chrono::Utc::now);
        table.rows.push(TemplateRow {
            id,
            meta,
            shapes,
            content,
            digest,
        });
        Ok(id)
    }

    async fn find_by_name_and_version(&self, name: &str, version: &str) -> Result<String> {
        self.inner
            .read()
            .rows
            .iter()
            .find(|r| r.meta.name == name && r.meta.version == version)
            .map(|r| r.content.clone())
            .ok_or_else(|| {
                ValidatorError::not_found(format!(
                    "No template found with name {name} and version {version}"
                ))
            })
    }

    async fn find_by_id(&self, id: i64) -> Result<(ResourceMetadata, String)> {
        self.inner
            .read()
            .rows
            .iter()
            .find(|r| r.id == id)
            .map(|r| (r.meta.clone(), r.content.clone()))
            .ok_or_else(|| ValidatorError::not_found(format!("No template found with id {id}")))
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let mut table = self.inner.write();
        let before = table.rows.len();
        // Shape metadata lives inside the row, so the cascade is implicit.
        table.rows.retain(|r| r.id != id);
        if table.rows.len() == before {
            return Err(ValidatorError::not_found(format!(
                "No template found with id {id}"
            )));
        }
        Ok(())
    }

    async fn search(&self, query: &SearchQuery) -> Result<PagedResult<ResourceMetadata>> {
        let table = self.inner.read();
        Ok(page(
            table
                .rows
                .iter()
                .filter(|r| matches_query(&r.meta, query))
                .cloned(),
            query,
            |r: &TemplateRow| &r.meta,
        ))
    }

    async fn find_tier_match(&self, input: &InputMetadata) -> Result<MatchResult<String>> {
        let table = self.inner.read();

        // Rows tying on score resolve by registration order.
        let mut best: Option<(f64, i64, MatchKind, &TemplateRow)> = None;
        for row in &table.rows {
            let mut row_best: Option<(f64, MatchKind)> = None;
            for shape in &row.shapes {
                if let (Some(target), Some(input_type)) = (&shape.target_class, &input.type_uri) {
                    if target == input_type {
                        row_best = max_tier(row_best, EXACT_TYPE_SCORE, MatchKind::ExactTypeMatch);
                    }
                }
                if let (Some(vocab), Some(input_vocab)) =
                    (&shape.vocabulary_uri, &input.vocabulary_uri)
                {
                    if vocab == input_vocab {
                        row_best = max_tier(row_best, VOCABULARY_SCORE, MatchKind::VocabularyMatch);
                    }
                }
            }
            if let (Some(ctx), Some(input_ctx)) = (&row.meta.context_uri, &input.context_uri) {
                if ctx == input_ctx {
                    row_best = max_tier(row_best, CONTEXT_URI_SCORE, MatchKind::ContextUriMatch);
                }
            }

            if let Some((score, kind)) = row_best {
                let replace = match &best {
                    Some((best_score, best_id, _, _)) => {
                        score > *best_score || (score == *best_score && row.id < *best_id)
                    }
                    None => true,
                };
                if replace {
                    best = Some((score, row.id, kind, row));
                }
            }
        }

        Ok(match best {
            Some((_, _, kind, row)) => MatchResult::Match {
                name: row.meta.name.clone(),
                version: row.meta.version.clone(),
                resource: row.content.clone(),
                kind,
            },
            None => MatchResult::None,
        })
    }
}

fn max_tier(current: Option<(f64, MatchKind)>, score: f64, kind: MatchKind) -> Option<(f64, MatchKind)> {
    match current {
        Some((existing, _)) if existing >= score => current,
        _ => Some((score, kind)),
    }
}
