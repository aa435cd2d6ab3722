//! RDF graph services backed by oxigraph.
//!
//! [`GraphEngine`] is the seam between the validation pipeline and the RDF
//! toolkit: JSON-LD expansion for metadata extraction and shape evaluation
//! for semantic validation both go through it, so tests can substitute a
//! canned engine.

use oxigraph::io::{JsonLdProfileSet, RdfFormat};
use oxigraph::model::{
    GraphNameRef, NamedNode, Quad, QuadRef, Subject, SubjectRef, Term,
};
use oxigraph::store::Store;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ValidatorError};

pub const SH_NS: &str = "http://www.w3.org/ns/shacl#";
pub const RDF_NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
pub const OWL_NS: &str = "http://www.w3.org/2002/07/owl#";

/// Outcome of evaluating a data graph against a set of shapes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShapeReport {
    pub conforms: bool,
    pub violations: Vec<ShapeViolation>,
}

/// A single constraint violation raised during shape evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShapeViolation {
    pub focus_node: Option<String>,
    pub path: Option<String>,
    pub message: String,
}

/// RDF operations the validators depend on.
pub trait GraphEngine: Send + Sync {
    /// Parse a JSON-LD document and return its expanded quads.
    fn expand(&self, document: &str) -> Result<Vec<Quad>>;

    /// Evaluate a JSON-LD document against Turtle-encoded node shapes.
    fn evaluate_shapes(&self, shapes_turtle: &str, document: &str) -> Result<ShapeReport>;
}

/// [`GraphEngine`] implementation over an in-process oxigraph [`Store`].
#[derive(Debug, Default)]
pub struct OxigraphEngine;

impl OxigraphEngine {
    pub fn new() -> Self {
        Self
    }

    fn load_jsonld(&self, document: &str) -> Result<Store> {
        let store = Store::new().map_err(anyhow::Error::from)?;
        store
            .load_from_reader(
                RdfFormat::JsonLd {
                    profile: JsonLdProfileSet::empty(),
                },
                document.as_bytes(),
            )
            .map_err(|e| ValidatorError::invalid_input(format!("unparsable JSON-LD document: {e}")))?;
        Ok(store)
    }

    fn load_turtle(&self, turtle: &str) -> Result<Store> {
        let store = Store::new().map_err(anyhow::Error::from)?;
        store
            .load_from_reader(RdfFormat::Turtle, turtle.as_bytes())
            .map_err(|e| ValidatorError::invalid_input(format!("unparsable Turtle content: {e}")))?;
        Ok(store)
    }
}

impl GraphEngine for OxigraphEngine {
    fn expand(&self, document: &str) -> Result<Vec<Quad>> {
        let store = self.load_jsonld(document)?;
        let mut quads = Vec::new();
        for quad in store.iter() {
            quads.push(quad.map_err(anyhow::Error::from)?);
        }
        Ok(quads)
    }

    fn evaluate_shapes(&self, shapes_turtle: &str, document: &str) -> Result<ShapeReport> {
        let shapes = self.load_turtle(shapes_turtle)?;
        let data = self.load_jsonld(document)?;

        let mut violations = Vec::new();
        for shape_id in node_shape_ids(&shapes)? {
            let Some(target_class) = object_named_node(&shapes, (&shape_id).into(), "targetClass")?
            else {
                continue;
            };
            let properties = property_shapes(&shapes, &shape_id)?;
            for focus in instances_of(&data, &target_class)? {
                for property in &properties {
                    check_property(&data, &focus, property, &mut violations)?;
                }
            }
        }

        Ok(ShapeReport {
            conforms: violations.is_empty(),
            violations,
        })
    }
}

fn sh(local: &str) -> NamedNode {
    NamedNode::new_unchecked(format!("{SH_NS}{local}"))
}

fn rdf_type() -> NamedNode {
    NamedNode::new_unchecked(format!("{RDF_NS}type"))
}

fn node_shape_ids(shapes: &Store) -> Result<Vec<NamedNode>> {
    let node_shape = sh("NodeShape");
    let mut ids = Vec::new();
    for quad in shapes.quads_for_pattern(
        None,
        Some(rdf_type().as_ref().into()),
        Some(node_shape.as_ref().into()),
        None,
    ) {
        let quad = quad.map_err(anyhow::Error::from)?;
        if let Subject::NamedNode(id) = &quad.subject {
            ids.push(id.clone());
        }
    }
    ids.sort_unstable_by(|a, b| a.as_str().cmp(b.as_str()));
    Ok(ids)
}

fn instances_of(data: &Store, class: &NamedNode) -> Result<Vec<Subject>> {
    let mut focus = Vec::new();
    for quad in data.quads_for_pattern(
        None,
        Some(rdf_type().as_ref().into()),
        Some(class.as_ref().into()),
        None,
    ) {
        let quad = quad.map_err(anyhow::Error::from)?;
        focus.push(quad.subject);
    }
    Ok(focus)
}

/// Constraints understood by the evaluator. Anything else in the shape
/// graph is ignored rather than rejected.
#[derive(Debug, Clone)]
struct PropertyConstraints {
    path: NamedNode,
    min_count: Option<i64>,
    max_count: Option<i64>,
    datatype: Option<NamedNode>,
    class: Option<NamedNode>,
    node_kind: Option<NamedNode>,
    pattern: Option<String>,
    message: Option<String>,
}

fn property_shapes(shapes: &Store, shape_id: &NamedNode) -> Result<Vec<PropertyConstraints>> {
    let sh_property = sh("property");
    let mut properties = Vec::new();
    for quad in shapes.quads_for_pattern(
        Some(shape_id.into()),
        Some(sh_property.as_ref().into()),
        None,
        None,
    ) {
        let quad = quad.map_err(anyhow::Error::from)?;
        let subject = match &quad.object {
            Term::BlankNode(b) => Subject::BlankNode(b.clone()),
            Term::NamedNode(n) => Subject::NamedNode(n.clone()),
            _ => continue,
        };
        let Some(path) = object_named_node(shapes, (&subject).into(), "path")? else {
            continue;
        };
        properties.push(PropertyConstraints {
            path,
            min_count: object_integer(shapes, (&subject).into(), "minCount")?,
            max_count: object_integer(shapes, (&subject).into(), "maxCount")?,
            datatype: object_named_node(shapes, (&subject).into(), "datatype")?,
            class: object_named_node(shapes, (&subject).into(), "class")?,
            node_kind: object_named_node(shapes, (&subject).into(), "nodeKind")?,
            pattern: object_string(shapes, (&subject).into(), "pattern")?,
            message: object_string(shapes, (&subject).into(), "message")?,
        });
    }
    Ok(properties)
}

fn check_property(
    data: &Store,
    focus: &Subject,
    property: &PropertyConstraints,
    violations: &mut Vec<ShapeViolation>,
) -> Result<()> {
    let values = property_values(data, focus, &property.path)?;
    let path = property.path.as_str().to_string();
    let mut violate = |message: String| {
        violations.push(ShapeViolation {
            focus_node: Some(focus.to_string()),
            path: Some(path.clone()),
            message: property.message.clone().unwrap_or(message),
        });
    };

    if let Some(min) = property.min_count {
        if (values.len() as i64) < min {
            violate(format!(
                "property {} must have at least {} value(s)",
                property.path, min
            ));
        }
    }
    if let Some(max) = property.max_count {
        if (values.len() as i64) > max {
            violate(format!(
                "property {} must have at most {} value(s)",
                property.path, max
            ));
        }
    }

    for value in &values {
        if let Some(datatype) = &property.datatype {
            match value {
                Term::Literal(lit) if lit.datatype() == datatype.as_ref() => {}
                _ => violate(format!("value must be a literal of datatype {datatype}")),
            }
        }
        if let Some(class) = &property.class {
            let is_instance = match value {
                Term::NamedNode(node) => data
                    .contains(QuadRef::new(
                        node,
                        &rdf_type(),
                        class,
                        GraphNameRef::DefaultGraph,
                    ))
                    .map_err(anyhow::Error::from)?,
                Term::BlankNode(node) => data
                    .contains(QuadRef::new(
                        node,
                        &rdf_type(),
                        class,
                        GraphNameRef::DefaultGraph,
                    ))
                    .map_err(anyhow::Error::from)?,
                _ => false,
            };
            if !is_instance {
                violate(format!("value must be an instance of {class}"));
            }
        }
        if let Some(node_kind) = &property.node_kind {
            let conforms = match node_kind.as_str().strip_prefix(SH_NS) {
                Some("IRI") => matches!(value, Term::NamedNode(_)),
                Some("Literal") => matches!(value, Term::Literal(_)),
                Some("BlankNode") => matches!(value, Term::BlankNode(_)),
                _ => true,
            };
            if !conforms {
                violate(format!("value must be of node kind {node_kind}"));
            }
        }
        if let (Some(pattern), Term::Literal(lit)) = (&property.pattern, value) {
            match Regex::new(pattern) {
                Ok(regex) => {
                    if !regex.is_match(lit.value()) {
                        violate(format!("value must match pattern {pattern}"));
                    }
                }
                Err(error) => {
                    tracing::warn!(%pattern, %error, "skipping unparsable sh:pattern");
                }
            }
        }
    }

    Ok(())
}

fn property_values(data: &Store, subject: &Subject, path: &NamedNode) -> Result<Vec<Term>> {
    let mut values = Vec::new();
    for quad in data.quads_for_pattern(Some(subject.into()), Some(path.into()), None, None) {
        let quad = quad.map_err(anyhow::Error::from)?;
        values.push(quad.object);
    }
    Ok(values)
}

fn object_term(store: &Store, subject: SubjectRef<'_>, local: &str) -> Result<Option<Term>> {
    let predicate = sh(local);
    for quad in store.quads_for_pattern(Some(subject), Some(predicate.as_ref().into()), None, None)
    {
        let quad = quad.map_err(anyhow::Error::from)?;
        return Ok(Some(quad.object));
    }
    Ok(None)
}

fn object_named_node(
    store: &Store,
    subject: SubjectRef<'_>,
    local: &str,
) -> Result<Option<NamedNode>> {
    match object_term(store, subject, local)? {
        Some(Term::NamedNode(node)) => Ok(Some(node)),
        _ => Ok(None),
    }
}

fn object_string(store: &Store, subject: SubjectRef<'_>, local: &str) -> Result<Option<String>> {
    match object_term(store, subject, local)? {
        Some(Term::Literal(lit)) => Ok(Some(lit.value().to_string())),
        _ => Ok(None),
    }
}

fn object_integer(store: &Store, subject: SubjectRef<'_>, local: &str) -> Result<Option<i64>> {
    match object_string(store, subject, local)? {
        Some(raw) => Ok(raw.parse::<i64>().ok()),
        None => Ok(None),
    }
}
