#![deny(missing_docs)]

//! # Document Index
//!
//! Catalogue of every `$ref` occurrence across the root document and the sibling
//! documents it (transitively) points at.
//!
//! - **refs**: `$ref` splitting, pointer decoding and URI joining.
//! - **registry**: caller-supplied sibling documents, keyed by URI.
//! - **reference**: occurrences and their edge context.
//!
//! Siblings are loaded only from the [`DocumentRegistry`]; the index never touches
//! the file system or the network.

pub mod reference;
pub mod refs;
pub mod registry;

pub use reference::{Edge, Reference};
pub use registry::DocumentRegistry;

use crate::document::{Document, NodeId};
use crate::error::AppResult;
use crate::resolver::CircularReferenceResult;
use refs::{parse_base_url, parse_reference, resolve_doc_uri, ReferenceKind, DUMMY_BASE};
use std::collections::HashMap;
use tracing::debug;
use url::Url;

/// Identifies one loaded document. The root document is always [`DocumentId::ROOT`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(pub(crate) usize);

impl DocumentId {
    /// The document the index was built from.
    pub const ROOT: DocumentId = DocumentId(0);

    /// Position of the document in load order.
    pub fn index(self) -> usize {
        self.0
    }
}

/// A node handle qualified by its document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Target {
    /// Owning document.
    pub document: DocumentId,
    /// Node inside that document's arena.
    pub node: NodeId,
}

/// Controls how the index treats references into other documents.
#[derive(Debug, Clone)]
pub struct IndexConfig {
    /// Base URI for relative references in the root document. Defaults to the
    /// root document's own URI.
    pub base_uri: Option<Url>,
    /// Load siblings from the registry when they are referenced.
    pub allow_external_references: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            base_uri: None,
            allow_external_references: true,
        }
    }
}

impl IndexConfig {
    /// Sets the base URI used for the root document.
    pub fn with_base_uri(mut self, base_uri: Url) -> Self {
        self.base_uri = Some(base_uri);
        self
    }

    /// Enables or disables sibling loading.
    pub fn with_external_references(mut self, allow: bool) -> Self {
        self.allow_external_references = allow;
        self
    }
}

/// The reference catalogue consumed by the resolver.
#[derive(Debug)]
pub struct SpecIndex {
    config: IndexConfig,
    documents: Vec<Document>,
    bases: Vec<Option<Url>>,
    by_uri: HashMap<String, DocumentId>,
    references: Vec<Reference>,
    circular_references: Vec<CircularReferenceResult>,
}

impl SpecIndex {
    /// Indexes a single document; references into other documents stay unresolved.
    pub fn new(root: Document) -> Self {
        Self::with_config(root, IndexConfig::default(), &DocumentRegistry::new())
    }

    /// Parses YAML (or JSON text) and indexes it.
    pub fn from_yaml(yaml: &str) -> AppResult<Self> {
        Ok(Self::new(Document::from_yaml(None, yaml)?))
    }

    /// Indexes `root` and every registry document reachable from it.
    pub fn with_config(root: Document, config: IndexConfig, registry: &DocumentRegistry) -> Self {
        let mut index = Self {
            config,
            documents: Vec::new(),
            bases: Vec::new(),
            by_uri: HashMap::new(),
            references: Vec::new(),
            circular_references: Vec::new(),
        };

        let base = index
            .config
            .base_uri
            .clone()
            .or_else(|| root.uri().cloned())
            .or_else(|| parse_base_url(DUMMY_BASE));
        index.add_document(root, base);
        index.build(registry);
        index
    }

    fn add_document(&mut self, doc: Document, base: Option<Url>) -> DocumentId {
        let id = DocumentId(self.documents.len());
        for alias in [doc.uri().cloned(), base.clone()].into_iter().flatten() {
            self.by_uri.entry(alias.to_string()).or_insert(id);
        }
        self.bases.push(base);
        self.documents.push(doc);
        id
    }

    fn build(&mut self, registry: &DocumentRegistry) {
        let mut next = 0;
        while next < self.documents.len() {
            let doc_id = DocumentId(next);
            let found = match self.documents[next].root() {
                Some(root) => reference::collect_references(&self.documents[next], doc_id, root),
                None => Vec::new(),
            };
            for r in &found {
                self.load_sibling(doc_id, &r.pointer, registry);
            }
            self.references.extend(found);
            next += 1;
        }

        let targets: Vec<Option<Target>> = self
            .references
            .iter()
            .map(|r| self.lookup_from(r.document, &r.pointer))
            .collect();
        for (r, target) in self.references.iter_mut().zip(targets) {
            r.target = target;
        }

        debug!(
            documents = self.documents.len(),
            references = self.references.len(),
            "spec index built"
        );
    }

    fn load_sibling(&mut self, from: DocumentId, pointer: &str, registry: &DocumentRegistry) {
        if !self.config.allow_external_references {
            return;
        }
        let parsed = parse_reference(pointer);
        if parsed.kind == ReferenceKind::Local {
            return;
        }
        let Some(uri) = resolve_doc_uri(parsed.document, self.base_of(from)) else {
            return;
        };
        if self.by_uri.contains_key(uri.as_str()) {
            return;
        }
        if let Some(doc) = registry.get(&uri) {
            debug!(uri = %uri, "loading sibling document");
            self.add_document(doc.clone(), Some(uri));
        }
    }

    /// Resolves a pointer written in the root document.
    pub fn lookup(&self, pointer: &str) -> Option<Target> {
        self.lookup_from(DocumentId::ROOT, pointer)
    }

    /// Resolves a pointer written in `from`. The same pointer always yields the
    /// same target. Only loaded documents are searched.
    pub fn lookup_from(&self, from: DocumentId, pointer: &str) -> Option<Target> {
        let parsed = parse_reference(pointer);
        let document = if parsed.kind == ReferenceKind::Local {
            from
        } else {
            let uri = resolve_doc_uri(parsed.document, self.base_of(from))?;
            *self.by_uri.get(uri.as_str())?
        };
        let node = self
            .documents
            .get(document.0)?
            .resolve_pointer(parsed.fragment.unwrap_or(""))?;
        Some(Target { document, node })
    }

    fn base_of(&self, document: DocumentId) -> Option<&Url> {
        self.bases.get(document.0).and_then(Option::as_ref)
    }

    /// Every reference occurrence, root document first, then siblings in load order.
    pub fn all_references(&self) -> &[Reference] {
        &self.references
    }

    /// Occurrences that live in one document.
    pub fn references_in(&self, document: DocumentId) -> impl Iterator<Item = &Reference> {
        self.references.iter().filter(move |r| r.document == document)
    }

    /// Occurrences found *inside* a target, with edges relative to that target.
    pub fn relatives_of(&self, target: Target) -> Vec<Reference> {
        let Some(doc) = self.documents.get(target.document.0) else {
            return Vec::new();
        };
        let mut found = reference::collect_references(doc, target.document, target.node);
        for r in found.iter_mut() {
            r.target = self.lookup_from(r.document, &r.pointer);
        }
        found
    }

    /// Which document a node handle belongs to.
    pub fn document_provenance(&self, target: Target) -> DocumentId {
        target.document
    }

    /// The root document.
    pub fn root_document(&self) -> &Document {
        &self.documents[DocumentId::ROOT.0]
    }

    /// A loaded document.
    pub fn document(&self, id: DocumentId) -> Option<&Document> {
        self.documents.get(id.0)
    }

    /// A loaded document, mutably. Used for inlining.
    pub fn document_mut(&mut self, id: DocumentId) -> Option<&mut Document> {
        self.documents.get_mut(id.0)
    }

    /// All loaded documents in load order.
    pub fn documents(&self) -> impl Iterator<Item = (DocumentId, &Document)> {
        self.documents
            .iter()
            .enumerate()
            .map(|(i, doc)| (DocumentId(i), doc))
    }

    /// Number of loaded documents, root included.
    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    /// The index configuration.
    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Cycles recorded by the last resolver run.
    pub fn circular_references(&self) -> &[CircularReferenceResult] {
        &self.circular_references
    }

    pub(crate) fn set_circular_references(&mut self, circular: Vec<CircularReferenceResult>) {
        self.circular_references = circular;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const ROOT: &str = r#"
openapi: 3.1.0
paths:
  /pets:
    get:
      responses:
        "200":
          $ref: 'responses.yaml#/Ok'
components:
  schemas:
    Pet:
      properties:
        owner:
          $ref: '#/components/schemas/Owner'
    Owner:
      type: object
"#;

    const RESPONSES: &str = r#"
Ok:
  description: ok
  content:
    application/json:
      schema:
        $ref: 'openapi.yaml#/components/schemas/Pet'
"#;

    fn index() -> SpecIndex {
        let mut registry = DocumentRegistry::new();
        registry
            .register_yaml("https://example.com/api/responses.yaml", RESPONSES)
            .unwrap();
        let base = Url::parse("https://example.com/api/openapi.yaml").unwrap();
        let root = Document::from_yaml(Some(base), ROOT).unwrap();
        SpecIndex::with_config(root, IndexConfig::default(), &registry)
    }

    #[test]
    fn test_index_loads_siblings_transitively() {
        let index = index();
        assert_eq!(index.document_count(), 2);

        let pointers: Vec<&str> = index
            .all_references()
            .iter()
            .map(|r| r.pointer.as_str())
            .collect();
        assert_eq!(
            pointers,
            vec![
                "responses.yaml#/Ok",
                "#/components/schemas/Owner",
                "openapi.yaml#/components/schemas/Pet",
            ]
        );
        assert!(index.all_references().iter().all(Reference::is_resolved));
    }

    #[test]
    fn test_lookup_is_idempotent_and_tracks_provenance() {
        let index = index();
        let first = index.lookup("responses.yaml#/Ok").unwrap();
        let second = index.lookup("responses.yaml#/Ok").unwrap();
        assert_eq!(first, second);
        assert_eq!(index.document_provenance(first), DocumentId(1));

        // a sibling's reference back into the root lands in the root
        let back = index
            .lookup_from(DocumentId(1), "openapi.yaml#/components/schemas/Pet")
            .unwrap();
        assert_eq!(back.document, DocumentId::ROOT);
    }

    #[test]
    fn test_external_references_can_be_disabled() {
        let mut registry = DocumentRegistry::new();
        registry
            .register_yaml("https://example.com/api/responses.yaml", RESPONSES)
            .unwrap();
        let base = Url::parse("https://example.com/api/openapi.yaml").unwrap();
        let root = Document::from_yaml(Some(base), ROOT).unwrap();
        let config = IndexConfig::default().with_external_references(false);
        let index = SpecIndex::with_config(root, config, &registry);

        assert_eq!(index.document_count(), 1);
        assert!(index.lookup("responses.yaml#/Ok").is_none());
        assert!(index.lookup("#/components/schemas/Owner").is_some());
    }

    #[test]
    fn test_relatives_of_uses_target_context() {
        let index = index();
        let pet = index.lookup("#/components/schemas/Pet").unwrap();
        let relatives = index.relatives_of(pet);
        assert_eq!(relatives.len(), 1);
        assert_eq!(relatives[0].name, "Owner");
        assert!(relatives[0].edge.optional);
    }

    #[test]
    fn test_missing_pointer_has_no_target() {
        let index = SpecIndex::from_yaml("a:\n  $ref: '#/components/schemas/crackers'\n").unwrap();
        assert_eq!(index.all_references().len(), 1);
        assert!(!index.all_references()[0].is_resolved());
        assert!(index.lookup("go home, I am drunk").is_none());
    }
}
