//! # Document Registry
//!
//! Stores externally supplied sibling documents for multi-document reference
//! resolution. No network or file access is performed: a sibling is only
//! reachable if the caller registered it here before building the index.

use crate::document::Document;
use crate::error::{AppError, AppResult};
use crate::index::refs::parse_base_url;
use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use url::Url;

/// Registry of parsed sibling documents, keyed by their normalized URI.
#[derive(Debug, Default)]
pub struct DocumentRegistry {
    docs: IndexMap<String, Document>,
}

impl DocumentRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses and registers a YAML (or JSON text) document.
    ///
    /// `retrieval_uri` may be absolute (`https://...`) or a relative path such as
    /// `schemas/pet.yaml`.
    pub fn register_yaml(&mut self, retrieval_uri: &str, yaml: &str) -> AppResult<()> {
        let uri = parse_uri(retrieval_uri)?;
        let doc = Document::from_yaml(Some(uri), yaml)?;
        self.register_document(doc)
    }

    /// Registers a document from an already parsed JSON value.
    pub fn register_json(&mut self, retrieval_uri: &str, raw: &JsonValue) -> AppResult<()> {
        let uri = parse_uri(retrieval_uri)?;
        self.register_document(Document::from_json(Some(uri), raw))
    }

    /// Registers a prepared document. The document must carry a URI.
    pub fn register_document(&mut self, doc: Document) -> AppResult<()> {
        let Some(uri) = doc.uri() else {
            return Err(AppError::Registry(
                "cannot register a document without a URI".to_string(),
            ));
        };
        let key = uri.to_string();
        if self.docs.contains_key(&key) {
            return Err(AppError::Registry(format!(
                "URI collision for '{}': already registered",
                key
            )));
        }
        self.docs.insert(key, doc);
        Ok(())
    }

    /// Returns a registered document by URI.
    pub fn get(&self, uri: &Url) -> Option<&Document> {
        self.docs.get(uri.as_str())
    }

    /// URIs of every registered document, in registration order.
    pub fn uris(&self) -> impl Iterator<Item = &str> {
        self.docs.keys().map(String::as_str)
    }

    /// Number of registered documents.
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

fn parse_uri(retrieval_uri: &str) -> AppResult<Url> {
    parse_base_url(retrieval_uri).ok_or_else(|| {
        AppError::General(format!("Unable to parse document URI '{}'", retrieval_uri))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_registry_normalizes_relative_uris() {
        let mut registry = DocumentRegistry::new();
        registry
            .register_yaml("schemas/pet.yaml", "Pet:\n  type: object\n")
            .unwrap();

        let uri = Url::parse("http://example.invalid/schemas/pet.yaml").unwrap();
        assert!(registry.get(&uri).is_some());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_registry_rejects_collisions() {
        let mut registry = DocumentRegistry::new();
        registry
            .register_json("https://example.com/a.json", &json!({}))
            .unwrap();
        let err = registry
            .register_json("https://example.com/a.json#/ignored", &json!({}))
            .unwrap_err();
        assert!(matches!(err, AppError::Registry(_)));
    }

    #[test]
    fn test_registry_requires_uri() {
        let mut registry = DocumentRegistry::new();
        let err = registry
            .register_document(Document::new(None))
            .unwrap_err();
        assert!(matches!(err, AppError::Registry(_)));
    }
}
