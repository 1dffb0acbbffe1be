//! Reference occurrences and the edge context they were found in.

use crate::document::{Document, NodeId, NodeKind, Position};
use crate::index::refs::reference_name;
use crate::index::{DocumentId, Target};
use std::collections::HashSet;

/// Composition keywords that offer alternatives instead of one mandatory schema.
pub const POLYMORPHIC_KEYWORDS: [&str; 3] = ["anyOf", "oneOf", "allOf"];

/// Keywords whose subschemas describe collection members, which may be empty.
pub const COLLECTION_KEYWORDS: [&str; 7] = [
    "items",
    "prefixItems",
    "additionalItems",
    "unevaluatedItems",
    "contains",
    "additionalProperties",
    "patternProperties",
];

/// How a reference is reached from the definition that contains it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Edge {
    /// The first composition keyword passed through, if any.
    pub polymorphic: Option<String>,
    /// Passed through an array or map indirection.
    pub array: bool,
    /// Passed through a property that is not listed in `required`.
    pub optional: bool,
}

impl Edge {
    /// A mandatory edge offers no escape from expansion.
    pub fn is_mandatory(&self) -> bool {
        self.polymorphic.is_none() && !self.array && !self.optional
    }

    /// Returns `true` if the edge passes through a composition keyword.
    pub fn is_polymorphic(&self) -> bool {
        self.polymorphic.is_some()
    }

    fn through_composition(&self, keyword: &str) -> Self {
        let mut next = self.clone();
        next.polymorphic.get_or_insert_with(|| keyword.to_string());
        next
    }

    fn through_collection(&self) -> Self {
        Self {
            array: true,
            ..self.clone()
        }
    }

    fn through_property(&self, required: bool) -> Self {
        Self {
            optional: self.optional || !required,
            ..self.clone()
        }
    }
}

/// One occurrence of a `$ref` pointer.
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    /// The pointer exactly as written.
    pub pointer: String,
    /// Last pointer segment, used in messages.
    pub name: String,
    /// Document the occurrence lives in.
    pub document: DocumentId,
    /// The mapping node holding `$ref`; inlining replaces its content.
    pub node: NodeId,
    /// Position of the `$ref` key.
    pub position: Position,
    /// Resolved definition, `None` when the pointer leads nowhere.
    pub target: Option<Target>,
    /// Context relative to the enclosing definition.
    pub edge: Edge,
}

impl Reference {
    /// Returns `true` when the index found a target for this pointer.
    pub fn is_resolved(&self) -> bool {
        self.target.is_some()
    }

    /// The occurrence itself as a handle.
    pub fn occurrence(&self) -> Target {
        Target {
            document: self.document,
            node: self.node,
        }
    }
}

/// Collects every reference below `start`, in declaration order.
///
/// Targets are left unset; the index fills them in.
pub(crate) fn collect_references(
    doc: &Document,
    document: DocumentId,
    start: NodeId,
) -> Vec<Reference> {
    let mut collector = Collector {
        doc,
        document,
        seen: HashSet::new(),
        found: Vec::new(),
    };
    collector.walk(start, Edge::default());
    collector.found
}

struct Collector<'a> {
    doc: &'a Document,
    document: DocumentId,
    seen: HashSet<NodeId>,
    found: Vec<Reference>,
}

impl<'a> Collector<'a> {
    fn walk(&mut self, id: NodeId, edge: Edge) {
        // aliased nodes are reachable more than once
        if !self.seen.insert(id) {
            return;
        }
        let doc = self.doc;
        let Some(node) = doc.get(id) else {
            return;
        };

        match &node.kind {
            NodeKind::Sequence(items) => {
                for item in items {
                    self.walk(*item, edge.clone());
                }
            }
            NodeKind::Mapping(entries) => {
                if let Some((pointer, position)) = doc.ref_value(id) {
                    self.found.push(Reference {
                        pointer: pointer.to_string(),
                        name: reference_name(pointer),
                        document: self.document,
                        node: id,
                        position,
                        target: None,
                        edge,
                    });
                    return;
                }

                let array_schema = self.is_array_schema(id);
                for (key, entry) in entries {
                    let mut child = if array_schema {
                        edge.through_collection()
                    } else {
                        edge.clone()
                    };
                    if POLYMORPHIC_KEYWORDS.contains(&key.as_str()) {
                        child = child.through_composition(key);
                    } else if COLLECTION_KEYWORDS.contains(&key.as_str()) {
                        child = child.through_collection();
                    } else if key == "properties" {
                        self.walk_properties(id, entry.value, child);
                        continue;
                    }
                    self.walk(entry.value, child);
                }
            }
            NodeKind::Null | NodeKind::Scalar(_) => {}
        }
    }

    /// Property names are not keywords; each value is a subschema.
    fn walk_properties(&mut self, schema: NodeId, properties: NodeId, edge: Edge) {
        let doc = self.doc;
        let Some(entries) = doc.get(properties).and_then(|n| n.as_mapping()) else {
            self.walk(properties, edge);
            return;
        };
        if !self.seen.insert(properties) {
            return;
        }
        let required = self.required_names(schema);
        for (name, entry) in entries {
            let child = edge.through_property(required.contains(name.as_str()));
            self.walk(entry.value, child);
        }
    }

    fn required_names(&self, schema: NodeId) -> HashSet<&'a str> {
        let doc = self.doc;
        doc.mapping_value(schema, "required")
            .and_then(|id| doc.get(id))
            .and_then(|n| n.as_sequence())
            .map(|items| items.iter().filter_map(|item| doc.scalar(*item)).collect())
            .unwrap_or_default()
    }

    fn is_array_schema(&self, schema: NodeId) -> bool {
        let Some(ty) = self.doc.mapping_value(schema, "type") else {
            return false;
        };
        match self.doc.get(ty).map(|n| &n.kind) {
            Some(NodeKind::Scalar(s)) => s.value == "array",
            Some(NodeKind::Sequence(items)) => {
                // `[array, "null"]` still describes a list
                items.iter().any(|item| self.doc.scalar(*item) == Some("array"))
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn refs(yaml: &str) -> Vec<Reference> {
        let doc = Document::from_yaml(None, yaml).unwrap();
        collect_references(&doc, DocumentId::ROOT, doc.root().unwrap())
    }

    #[test]
    fn test_collect_required_and_optional_properties() {
        let found = refs(
            r#"
type: object
required: [child]
properties:
  child:
    $ref: '#/A'
  sibling:
    $ref: '#/B'
"#,
        );
        assert_eq!(found.len(), 2);
        assert!(found[0].edge.is_mandatory());
        assert_eq!(found[0].name, "A");
        assert!(found[1].edge.optional);
    }

    #[test]
    fn test_collect_composition_and_collections() {
        let found = refs(
            r#"
anyOf:
  - $ref: '#/A'
properties:
  list:
    type: array
    items:
      $ref: '#/B'
additionalProperties:
  $ref: '#/C'
"#,
        );
        assert_eq!(found[0].edge.polymorphic.as_deref(), Some("anyOf"));
        assert!(found[1].edge.array);
        // `list` is optional as well
        assert!(found[1].edge.optional);
        assert!(found[2].edge.array);
        assert!(!found[2].edge.optional);
    }

    #[test]
    fn test_collect_stops_at_reference_nodes() {
        let found = refs("$ref: '#/A'\ndescription: ignored\n");
        assert_eq!(found.len(), 1);
        assert!(found[0].edge.is_mandatory());
        assert_eq!(found[0].position, Position::new(1, 1));
    }

    #[test]
    fn test_collect_ignores_non_string_refs() {
        let found = refs("$ref:\n  nested: true\nproperties:\n  a:\n    $ref: '#/A'\n");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].pointer, "#/A");
    }
}
