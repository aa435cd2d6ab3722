//! Metadata extraction from SHACL templates.
//!
//! When a template is registered its shapes are indexed for tier matching.
//! Only named node shapes contribute a record; anonymous shapes cannot be
//! referenced later and are skipped.

use std::collections::HashMap;

use oxigraph::io::RdfFormat;
use oxigraph::model::{NamedNode, Subject, SubjectRef, Term};
use oxigraph::store::Store;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ValidatorError};
use crate::graph::{OWL_NS, RDF_NS, SH_NS};
use crate::jsonld::extract_namespace;

/// Matching metadata for one named node shape in a template. The context
/// URI used for tier matching lives on the owning template's registration
/// metadata, not here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeMetadata {
    pub shape_id: String,
    pub target_class: Option<String>,
    pub vocabulary_uri: Option<String>,
    pub ontology_uri: Option<String>,
}

/// Target predicates in the order they are consulted.
const TARGET_PREDICATES: [&str; 4] = [
    "targetClass",
    "targetNode",
    "targetSubjectsOf",
    "targetObjectsOf",
];

/// Parse a Turtle-encoded template and extract one record per named shape.
pub fn extract_shape_metadata(turtle: &str) -> Result<Vec<ShapeMetadata>> {
    let store = Store::new().map_err(anyhow::Error::from)?;
    store
        .load_from_reader(RdfFormat::Turtle, turtle.as_bytes())
        .map_err(|e| ValidatorError::invalid_input(format!("unparsable SHACL template: {e}")))?;

    let ontology_import = first_owl_import(&store)?;

    let rdf_type = NamedNode::new_unchecked(format!("{RDF_NS}type"));
    let node_shape = NamedNode::new_unchecked(format!("{SH_NS}NodeShape"));
    let mut shape_ids = Vec::new();
    for quad in store.quads_for_pattern(
        None,
        Some(rdf_type.as_ref().into()),
        Some(node_shape.as_ref().into()),
        None,
    ) {
        let quad = quad.map_err(anyhow::Error::from)?;
        if let Subject::NamedNode(id) = &quad.subject {
            shape_ids.push(id.clone());
        }
    }
    shape_ids.sort_unstable_by(|a, b| a.as_str().cmp(b.as_str()));

    let mut shapes = Vec::with_capacity(shape_ids.len());
    for shape_id in shape_ids {
        let ontology_uri = ontology_import
            .clone()
            .or_else(|| truncate_to_ontology(shape_id.as_str()));
        shapes.push(ShapeMetadata {
            target_class: first_target(&store, &shape_id)?,
            vocabulary_uri: property_path_vocabulary(&store, &shape_id)?,
            ontology_uri,
            shape_id: shape_id.into_string(),
        });
    }
    Ok(shapes)
}

fn first_owl_import(store: &Store) -> Result<Option<String>> {
    let imports = NamedNode::new_unchecked(format!("{OWL_NS}imports"));
    for quad in store.quads_for_pattern(None, Some(imports.as_ref().into()), None, None) {
        let quad = quad.map_err(anyhow::Error::from)?;
        if let Term::NamedNode(ontology) = &quad.object {
            return Ok(Some(ontology.as_str().to_string()));
        }
    }
    Ok(None)
}

fn first_target(store: &Store, shape_id: &NamedNode) -> Result<Option<String>> {
    for local in TARGET_PREDICATES {
        let predicate = NamedNode::new_unchecked(format!("{SH_NS}{local}"));
        for quad in store.quads_for_pattern(
            Some(shape_id.into()),
            Some(predicate.as_ref().into()),
            None,
            None,
        ) {
            let quad = quad.map_err(anyhow::Error::from)?;
            if let Term::NamedNode(target) = &quad.object {
                return Ok(Some(target.as_str().to_string()));
            }
        }
    }
    Ok(None)
}

/// Most frequent namespace among the shape's own property paths. Ties
/// resolve to the lexicographically smallest namespace.
fn property_path_vocabulary(store: &Store, shape_id: &NamedNode) -> Result<Option<String>> {
    let sh_property = NamedNode::new_unchecked(format!("{SH_NS}property"));
    let sh_path = NamedNode::new_unchecked(format!("{SH_NS}path"));

    let mut tally: HashMap<String, usize> = HashMap::new();
    for quad in store.quads_for_pattern(
        Some(shape_id.into()),
        Some(sh_property.as_ref().into()),
        None,
        None,
    ) {
        let quad = quad.map_err(anyhow::Error::from)?;
        let property: SubjectRef<'_> = match &quad.object {
            Term::BlankNode(b) => b.into(),
            Term::NamedNode(n) => n.into(),
            _ => continue,
        };
        for path_quad in
            store.quads_for_pattern(Some(property), Some(sh_path.as_ref().into()), None, None)
        {
            let path_quad = path_quad.map_err(anyhow::Error::from)?;
            if let Term::NamedNode(path) = &path_quad.object {
                *tally
                    .entry(extract_namespace(path.as_str()).to_string())
                    .or_default() += 1;
            }
        }
    }

    Ok(tally
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)))
        .map(|(ns, _)| ns))
}

/// Derive an ontology URI from a shape URI by dropping the fragment or the
/// last path segment.
fn truncate_to_ontology(shape_uri: &str) -> Option<String> {
    let idx = shape_uri.rfind('#').or_else(|| shape_uri.rfind('/'))?;
    if idx == 0 {
        return None;
    }
    Some(shape_uri[..idx].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: &str = r#"
        @prefix sh: <http://www.w3.org/ns/shacl#> .
        @prefix owl: <http://www.w3.org/2002/07/owl#> .
        @prefix veh: <https://example.org/vehicle#> .
        @prefix aux: <https://example.org/aux#> .

        <https://example.org/shapes> a owl:Ontology ;
            owl:imports <https://example.org/vehicle-ontology> .

        veh:VehicleShape a sh:NodeShape ;
            sh:targetClass veh:Vehicle ;
            sh:property [ sh:path veh:vin ; sh:minCount 1 ] ;
            sh:property [ sh:path veh:model ] ;
            sh:property [ sh:path aux:note ] .

        [] a sh:NodeShape ;
            sh:targetClass aux:Ignored .
    "#;

    #[test]
    fn named_shapes_are_extracted_and_anonymous_ones_skipped() {
        let shapes = extract_shape_metadata(TEMPLATE).unwrap();
        assert_eq!(shapes.len(), 1);
        let shape = &shapes[0];
        assert_eq!(shape.shape_id, "https://example.org/vehicle#VehicleShape");
        assert_eq!(
            shape.target_class.as_deref(),
            Some("https://example.org/vehicle#Vehicle")
        );
    }

    #[test]
    fn vocabulary_comes_from_property_path_frequency() {
        let shapes = extract_shape_metadata(TEMPLATE).unwrap();
        assert_eq!(
            shapes[0].vocabulary_uri.as_deref(),
            Some("https://example.org/vehicle#")
        );
    }

    #[test]
    fn ontology_uri_prefers_owl_imports() {
        let shapes = extract_shape_metadata(TEMPLATE).unwrap();
        assert_eq!(
            shapes[0].ontology_uri.as_deref(),
            Some("https://example.org/vehicle-ontology")
        );
    }

    #[test]
    fn ontology_uri_falls_back_to_shape_uri_truncation() {
        let template = r#"
            @prefix sh: <http://www.w3.org/ns/shacl#> .
            <https://example.org/shapes/Battery> a sh:NodeShape ;
                sh:targetClass <https://example.org/battery#Battery> .
        "#;
        let shapes = extract_shape_metadata(template).unwrap();
        assert_eq!(
            shapes[0].ontology_uri.as_deref(),
            Some("https://example.org/shapes")
        );
    }

    #[test]
    fn unparsable_turtle_is_invalid_input() {
        let error = extract_shape_metadata("not turtle @@@").unwrap_err();
        assert!(matches!(error, ValidatorError::InvalidInput(_)));
    }

    #[test]
    fn shape_without_targets_still_yields_a_record() {
        let template = r#"
            @prefix sh: <http://www.w3.org/ns/shacl#> .
            <https://example.org/vocab#Bare> a sh:NodeShape .
        "#;
        let shapes = extract_shape_metadata(template).unwrap();
        assert_eq!(shapes.len(), 1);
        assert_eq!(shapes[0].target_class, None);
        assert_eq!(shapes[0].vocabulary_uri, None);
    }
}
