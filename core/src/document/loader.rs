//! Event-driven YAML loader that keeps source positions.
//!
//! `serde`-style deserializers drop line and column information, so the document
//! arena is built directly from the scanner's marked events.

use super::{Document, MapEntry, Node, NodeId, NodeKind, Position, Scalar};
use crate::error::AppResult;
use indexmap::IndexMap;
use std::collections::HashMap;
use url::Url;
use yaml_rust2::parser::{Event, MarkedEventReceiver, Parser};
use yaml_rust2::scanner::{Marker, TScalarStyle};

/// Parses `source` into a new [`Document`].
pub(crate) fn load(uri: Option<Url>, source: &str) -> AppResult<Document> {
    let mut builder = TreeBuilder::new(Document::new(uri));
    let mut parser = Parser::new(source.chars());
    parser.load(&mut builder, false)?;
    Ok(builder.finish())
}

enum Frame {
    Sequence {
        id: NodeId,
        anchor: usize,
        items: Vec<NodeId>,
    },
    Mapping {
        id: NodeId,
        anchor: usize,
        entries: IndexMap<String, MapEntry>,
        pending_key: Option<(String, Position)>,
    },
}

struct TreeBuilder {
    doc: Document,
    stack: Vec<Frame>,
    anchors: HashMap<usize, NodeId>,
    done: bool,
}

impl TreeBuilder {
    fn new(doc: Document) -> Self {
        Self {
            doc,
            stack: Vec::new(),
            anchors: HashMap::new(),
            done: false,
        }
    }

    fn finish(self) -> Document {
        self.doc
    }

    fn remember(&mut self, anchor: usize, id: NodeId) {
        if anchor > 0 {
            self.anchors.insert(anchor, id);
        }
    }

    /// Hands a completed node to its parent frame (or makes it the root).
    fn attach(&mut self, id: NodeId, position: Position) {
        let key_text = match self.stack.last() {
            Some(Frame::Mapping {
                pending_key: None, ..
            }) => Some(self.key_text(id)),
            _ => None,
        };

        match self.stack.last_mut() {
            None => {
                self.doc.set_root(Some(id));
                self.done = true;
            }
            Some(Frame::Sequence { items, .. }) => items.push(id),
            Some(Frame::Mapping {
                entries,
                pending_key,
                ..
            }) => match pending_key.take() {
                Some((key, key_position)) => {
                    entries.insert(
                        key,
                        MapEntry {
                            key_position,
                            value: id,
                        },
                    );
                }
                None => *pending_key = Some((key_text.unwrap_or_default(), position)),
            },
        }
    }

    /// Non-scalar keys are rare; they are flattened to their JSON text.
    fn key_text(&self, id: NodeId) -> String {
        match self.doc.get(id).map(|n| &n.kind) {
            Some(NodeKind::Scalar(s)) => s.value.clone(),
            Some(NodeKind::Null) | None => String::new(),
            Some(_) => self.doc.to_json(id).to_string(),
        }
    }

    fn on_scalar(&mut self, value: String, style: TScalarStyle, anchor: usize, position: Position) {
        let plain = matches!(style, TScalarStyle::Plain);

        // plain keys skip the arena entirely
        if anchor == 0 {
            if let Some(Frame::Mapping { pending_key, .. }) = self.stack.last_mut() {
                if pending_key.is_none() {
                    *pending_key = Some((value, position));
                    return;
                }
            }
        }

        let kind = if plain && matches!(value.as_str(), "~" | "null" | "Null" | "NULL" | "") {
            NodeKind::Null
        } else {
            NodeKind::Scalar(Scalar { value, plain })
        };
        let id = self.doc.push(Node::new(kind, position));
        self.remember(anchor, id);
        self.attach(id, position);
    }

    fn on_collection_end(&mut self) {
        let Some(frame) = self.stack.pop() else {
            return;
        };
        let (id, anchor, kind) = match frame {
            Frame::Sequence { id, anchor, items } => (id, anchor, NodeKind::Sequence(items)),
            Frame::Mapping {
                id,
                anchor,
                entries,
                ..
            } => (id, anchor, NodeKind::Mapping(entries)),
        };
        self.doc.set_kind(id, kind);
        self.remember(anchor, id);
        let position = self.doc.get(id).map(|n| n.position).unwrap_or_default();
        self.attach(id, position);
    }
}

impl MarkedEventReceiver for TreeBuilder {
    fn on_event(&mut self, ev: Event, mark: Marker) {
        if self.done {
            return;
        }
        let position = Position::new(mark.line(), mark.col() + 1);
        match ev {
            Event::Scalar(value, style, anchor, ..) => {
                self.on_scalar(value, style, anchor, position)
            }
            Event::SequenceStart(anchor, ..) => {
                let id = self.doc.push(Node::new(NodeKind::Null, position));
                self.stack.push(Frame::Sequence {
                    id,
                    anchor,
                    items: Vec::new(),
                });
            }
            Event::MappingStart(anchor, ..) => {
                let id = self.doc.push(Node::new(NodeKind::Null, position));
                self.stack.push(Frame::Mapping {
                    id,
                    anchor,
                    entries: IndexMap::new(),
                    pending_key: None,
                });
            }
            Event::SequenceEnd | Event::MappingEnd => self.on_collection_end(),
            Event::Alias(anchor) => {
                // the alias shares the anchored node
                match self.anchors.get(&anchor).copied() {
                    Some(id) => self.attach(id, position),
                    None => {
                        let id = self.doc.push(Node::new(NodeKind::Null, position));
                        self.attach(id, position);
                    }
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_load_keeps_key_positions() {
        let yaml = "paths:\n  /hey:\n    get:\n      $ref: '#/x'\n";
        let doc = load(None, yaml).unwrap();
        let root = doc.root().unwrap();
        let entry = doc.get(root).unwrap().as_mapping().unwrap()["paths"];
        assert_eq!(entry.key_position, Position::new(1, 1));

        let get = doc.resolve_pointer("/paths/~1hey/get").unwrap();
        let (pointer, position) = doc.ref_value(get).unwrap();
        assert_eq!(pointer, "#/x");
        assert_eq!(position, Position::new(4, 7));
    }

    #[test]
    fn test_load_json_input() {
        let doc = load(None, r#"{"a": [1, "two", {"b": false}]}"#).unwrap();
        assert_eq!(doc.root_json(), json!({"a": [1, "two", {"b": false}]}));
    }

    #[test]
    fn test_load_alias_shares_anchor() {
        let doc = load(None, "base: &b {type: string}\nother: *b\n").unwrap();
        let root = doc.root().unwrap();
        assert_eq!(
            doc.mapping_value(root, "base"),
            doc.mapping_value(root, "other")
        );
    }

    #[test]
    fn test_load_empty_and_invalid_input() {
        let empty = load(None, "").unwrap();
        assert!(empty.root().is_none());
        assert!(load(None, "a: [unclosed").is_err());
    }
}
