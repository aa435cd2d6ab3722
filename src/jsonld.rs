//! Metadata extraction from JSON-LD input documents.
//!
//! Template matching needs three facts about an incoming document: its RDF
//! type, the context URI it references, and the vocabulary its terms live
//! in. The context is read from the raw JSON, the rest from the expanded
//! graph.

use std::collections::{HashMap, HashSet};

use oxigraph::model::{Quad, Subject, Term};
use serde_json::Value;

use crate::error::{Result, ValidatorError};
use crate::graph::{GraphEngine, RDF_NS};

/// What an input document tells us about itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputMetadata {
    pub type_uri: Option<String>,
    pub context_uri: Option<String>,
    pub vocabulary_uri: Option<String>,
}

/// Extract matching metadata from a JSON-LD document.
///
/// An inline `@context` object with an `@vocab` entry names the vocabulary
/// directly. Otherwise the vocabulary is the most frequent namespace among
/// the expanded predicate IRIs.
pub fn extract_input_metadata(engine: &dyn GraphEngine, document: &str) -> Result<InputMetadata> {
    if document.trim().is_empty() {
        return Err(ValidatorError::invalid_input("empty JSON-LD document"));
    }
    let raw: Value = serde_json::from_str(document)
        .map_err(|e| ValidatorError::invalid_input(format!("malformed JSON document: {e}")))?;

    // Zero quads yields all-null metadata; the tier match then misses.
    let quads = engine.expand(document)?;

    let declared_vocab = inline_vocab(&raw);
    Ok(InputMetadata {
        type_uri: root_type(&quads),
        context_uri: context_reference(&raw),
        vocabulary_uri: declared_vocab.or_else(|| dominant_namespace(&quads)),
    })
}

/// Namespace of a URI: everything up to and including the last `#`, else
/// the last `/`, else the URI itself. Leading separators do not count.
pub fn extract_namespace(uri: &str) -> &str {
    if let Some(idx) = uri.rfind('#') {
        if idx > 0 {
            return &uri[..=idx];
        }
    }
    if let Some(idx) = uri.rfind('/') {
        if idx > 0 {
            return &uri[..=idx];
        }
    }
    uri
}

fn context_reference(raw: &Value) -> Option<String> {
    match raw.get("@context")? {
        Value::String(uri) => Some(uri.clone()),
        Value::Array(entries) => entries
            .iter()
            .find_map(|e| e.as_str())
            .map(|s| s.to_string()),
        _ => None,
    }
}

fn inline_vocab(raw: &Value) -> Option<String> {
    raw.get("@context")?
        .as_object()?
        .get("@vocab")?
        .as_str()
        .map(|s| s.to_string())
}

/// The `rdf:type` of the document's root node. The root is a subject that
/// never appears as an object; ties resolve to the lexicographically
/// smallest subject so repeated extraction is stable.
fn root_type(quads: &[Quad]) -> Option<String> {
    let rdf_type = format!("{RDF_NS}type");
    let referenced: HashSet<String> = quads
        .iter()
        .filter_map(|q| match &q.object {
            Term::NamedNode(n) => Some(n.as_str().to_string()),
            Term::BlankNode(b) => Some(b.to_string()),
            _ => None,
        })
        .collect();

    let mut types: Vec<&Quad> = quads
        .iter()
        .filter(|q| q.predicate.as_str() == rdf_type)
        .filter(|q| !referenced.contains(&subject_key(&q.subject)))
        .collect();
    types.sort_unstable_by_key(|q| subject_key(&q.subject));

    types.first().and_then(|q| match &q.object {
        Term::NamedNode(n) => Some(n.as_str().to_string()),
        _ => None,
    })
}

fn subject_key(subject: &Subject) -> String {
    match subject {
        Subject::NamedNode(n) => n.as_str().to_string(),
        other => other.to_string(),
    }
}

/// Most frequent namespace among the non-rdf predicate IRIs. Ties resolve
/// to the lexicographically smallest namespace.
fn dominant_namespace(quads: &[Quad]) -> Option<String> {
    let mut tally: HashMap<&str, usize> = HashMap::new();
    for quad in quads {
        let predicate = quad.predicate.as_str();
        if predicate.starts_with(RDF_NS) {
            continue;
        }
        *tally.entry(extract_namespace(predicate)).or_default() += 1;
    }
    tally
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)))
        .map(|(ns, _)| ns.to_string())
}
