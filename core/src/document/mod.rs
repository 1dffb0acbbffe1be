#![deny(missing_docs)]

//! # Document Tree
//!
//! A generic YAML / JSON node graph stored as an arena.
//!
//! Every node carries the source position it was parsed from, and every mapping key
//! keeps its own position so errors can point at the exact `$ref` key. Nodes are
//! addressed by [`NodeId`] handles; inlining a reference is a copy of a subtree into
//! the arena followed by repointing the reference node, never an ownership transfer.

pub mod loader;

use crate::error::AppResult;
use crate::index::refs::decode_pointer_segment;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Number, Value};
use std::fmt;
use url::Url;

/// The mapping key that marks a reference node.
pub const REF_KEY: &str = "$ref";

/// Stable handle to a node inside one [`Document`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Raw arena slot.
    pub fn index(self) -> usize {
        self.0
    }
}

/// A 1-based line / column pair. Nodes built from JSON values have `0:0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Position {
    /// Line number.
    pub line: usize,
    /// Column number.
    pub column: usize,
}

impl Position {
    /// Creates a position.
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A scalar value as written in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct Scalar {
    /// Raw text of the scalar.
    pub value: String,
    /// `true` for unquoted scalars, whose type is inferred on export.
    pub plain: bool,
}

/// The value side of a mapping entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapEntry {
    /// Where the key was written.
    pub key_position: Position,
    /// The value node.
    pub value: NodeId,
}

/// Node payload.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Explicit or implicit null (also used for empty documents).
    Null,
    /// A scalar.
    Scalar(Scalar),
    /// An ordered list of child nodes.
    Sequence(Vec<NodeId>),
    /// Key / value pairs in declaration order.
    Mapping(IndexMap<String, MapEntry>),
}

/// One node in the arena.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Node payload.
    pub kind: NodeKind,
    /// Where the node starts in the source.
    pub position: Position,
}

impl Node {
    /// Creates a node.
    pub fn new(kind: NodeKind, position: Position) -> Self {
        Self { kind, position }
    }

    /// Returns the entries if this node is a mapping.
    pub fn as_mapping(&self) -> Option<&IndexMap<String, MapEntry>> {
        match &self.kind {
            NodeKind::Mapping(entries) => Some(entries),
            _ => None,
        }
    }

    /// Returns the items if this node is a sequence.
    pub fn as_sequence(&self) -> Option<&[NodeId]> {
        match &self.kind {
            NodeKind::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the raw text if this node is a scalar.
    pub fn as_str(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Scalar(s) => Some(&s.value),
            _ => None,
        }
    }
}

/// A detached, self-contained copy of a subtree.
///
/// Slot `0` is the subtree root; child handles point into the same vector.
#[derive(Debug, Clone)]
pub struct Subtree {
    nodes: Vec<Node>,
}

impl Subtree {
    /// Number of nodes in the copy.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` when the copy holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// A parsed document: an arena of nodes plus the identity of the source.
#[derive(Debug, Clone, Default)]
pub struct Document {
    uri: Option<Url>,
    nodes: Vec<Node>,
    root: Option<NodeId>,
}

impl Document {
    /// Creates an empty document.
    pub fn new(uri: Option<Url>) -> Self {
        Self {
            uri,
            nodes: Vec::new(),
            root: None,
        }
    }

    /// Parses YAML (or JSON) text, keeping line and column of every node.
    ///
    /// Only the first document of a multi-document stream is loaded.
    pub fn from_yaml(uri: Option<Url>, source: &str) -> AppResult<Self> {
        loader::load(uri, source)
    }

    /// Builds a document from an already parsed JSON value. Positions are `0:0`.
    pub fn from_json(uri: Option<Url>, value: &Value) -> Self {
        let mut doc = Self::new(uri);
        let root = doc.push_json(value);
        doc.root = Some(root);
        doc
    }

    /// The URI the document was loaded from, if any.
    pub fn uri(&self) -> Option<&Url> {
        self.uri.as_ref()
    }

    /// Replaces the document URI.
    pub fn set_uri(&mut self, uri: Option<Url>) {
        self.uri = uri;
    }

    /// The root node, absent for empty input.
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Number of nodes in the arena, including nodes no longer reachable from the root.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the arena holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Looks up a node by handle.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub(crate) fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    pub(crate) fn set_root(&mut self, root: Option<NodeId>) {
        self.root = root;
    }

    pub(crate) fn set_kind(&mut self, id: NodeId, kind: NodeKind) {
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.kind = kind;
        }
    }

    /// Returns the value under `key` when `id` is a mapping.
    pub fn mapping_value(&self, id: NodeId, key: &str) -> Option<NodeId> {
        self.get(id)?.as_mapping()?.get(key).map(|entry| entry.value)
    }

    /// Returns the scalar text of `id`.
    pub fn scalar(&self, id: NodeId) -> Option<&str> {
        self.get(id)?.as_str()
    }

    /// If `id` is a reference node (a mapping with a string `$ref`), returns the
    /// pointer and the position of the `$ref` key.
    pub fn ref_value(&self, id: NodeId) -> Option<(&str, Position)> {
        let entry = self.get(id)?.as_mapping()?.get(REF_KEY)?;
        match &self.get(entry.value)?.kind {
            NodeKind::Scalar(s) => Some((s.value.as_str(), entry.key_position)),
            _ => None,
        }
    }

    /// Evaluates a JSON Pointer fragment (without the leading `#`) from the root.
    ///
    /// `""` and `"/"` both address the root. Segments are `~0` / `~1` and percent decoded.
    pub fn resolve_pointer(&self, fragment: &str) -> Option<NodeId> {
        let mut current = self.root?;
        if fragment.is_empty() || fragment == "/" {
            return Some(current);
        }
        let path = fragment.strip_prefix('/')?;
        for raw in path.split('/') {
            let segment = decode_pointer_segment(raw);
            let node = self.get(current)?;
            current = match &node.kind {
                NodeKind::Mapping(entries) => entries.get(&segment)?.value,
                NodeKind::Sequence(items) => *items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Exports the whole tree as JSON. Empty documents export as `null`.
    pub fn root_json(&self) -> Value {
        self.root.map(|root| self.to_json(root)).unwrap_or(Value::Null)
    }

    /// Exports a subtree as JSON.
    pub fn to_json(&self, id: NodeId) -> Value {
        let Some(node) = self.get(id) else {
            return Value::Null;
        };
        match &node.kind {
            NodeKind::Null => Value::Null,
            NodeKind::Scalar(s) if s.plain => plain_scalar_to_json(&s.value),
            NodeKind::Scalar(s) => Value::String(s.value.clone()),
            NodeKind::Sequence(items) => {
                Value::Array(items.iter().map(|item| self.to_json(*item)).collect())
            }
            NodeKind::Mapping(entries) => {
                let mut map = Map::new();
                for (key, entry) in entries {
                    map.insert(key.clone(), self.to_json(entry.value));
                }
                Value::Object(map)
            }
        }
    }

    /// Copies a subtree out of the arena. Aliased nodes are duplicated.
    pub fn export_subtree(&self, id: NodeId) -> Subtree {
        let mut nodes = Vec::new();
        self.export_into(id, &mut nodes);
        Subtree { nodes }
    }

    fn export_into(&self, id: NodeId, out: &mut Vec<Node>) -> Option<NodeId> {
        let node = self.get(id)?;
        let slot = out.len();
        out.push(Node::new(NodeKind::Null, node.position));
        let kind = match &node.kind {
            NodeKind::Sequence(items) => NodeKind::Sequence(
                items
                    .iter()
                    .filter_map(|item| self.export_into(*item, out))
                    .collect(),
            ),
            NodeKind::Mapping(entries) => NodeKind::Mapping(
                entries
                    .iter()
                    .filter_map(|(key, entry)| {
                        let value = self.export_into(entry.value, out)?;
                        Some((
                            key.clone(),
                            MapEntry {
                                key_position: entry.key_position,
                                value,
                            },
                        ))
                    })
                    .collect(),
            ),
            other => other.clone(),
        };
        out[slot].kind = kind;
        Some(NodeId(slot))
    }

    /// Replaces the content of `at` with a copied subtree.
    ///
    /// The node keeps its own position; the subtree's descendants are appended to
    /// the arena. Returns `false` if `at` does not exist or the subtree is empty.
    pub fn splice(&mut self, at: NodeId, subtree: Subtree) -> bool {
        if at.0 >= self.nodes.len() || subtree.nodes.is_empty() {
            return false;
        }
        // local slot 0 becomes `at`, local slot i > 0 lands at offset + i - 1
        let offset = self.nodes.len();
        let remap = |id: NodeId| -> NodeId {
            if id.0 == 0 {
                at
            } else {
                NodeId(offset + id.0 - 1)
            }
        };

        let mut nodes = subtree.nodes.into_iter();
        let Some(head) = nodes.next() else {
            return false;
        };
        for mut node in nodes {
            remap_children(&mut node.kind, remap);
            self.nodes.push(node);
        }
        let mut kind = head.kind;
        remap_children(&mut kind, remap);
        self.set_kind(at, kind);
        true
    }

    fn push_json(&mut self, value: &Value) -> NodeId {
        let position = Position::default();
        let kind = match value {
            Value::Null => NodeKind::Null,
            Value::Bool(b) => NodeKind::Scalar(Scalar {
                value: b.to_string(),
                plain: true,
            }),
            Value::Number(n) => NodeKind::Scalar(Scalar {
                value: n.to_string(),
                plain: true,
            }),
            Value::String(s) => NodeKind::Scalar(Scalar {
                value: s.clone(),
                plain: false,
            }),
            Value::Array(items) => {
                NodeKind::Sequence(items.iter().map(|item| self.push_json(item)).collect())
            }
            Value::Object(map) => NodeKind::Mapping(
                map.iter()
                    .map(|(key, item)| {
                        let value = self.push_json(item);
                        (
                            key.clone(),
                            MapEntry {
                                key_position: position,
                                value,
                            },
                        )
                    })
                    .collect(),
            ),
        };
        self.push(Node::new(kind, position))
    }
}

fn remap_children(kind: &mut NodeKind, remap: impl Fn(NodeId) -> NodeId) {
    match kind {
        NodeKind::Sequence(items) => {
            for item in items.iter_mut() {
                *item = remap(*item);
            }
        }
        NodeKind::Mapping(entries) => {
            for entry in entries.values_mut() {
                entry.value = remap(entry.value);
            }
        }
        NodeKind::Null | NodeKind::Scalar(_) => {}
    }
}

/// Infers the YAML core-schema type of a plain scalar.
fn plain_scalar_to_json(raw: &str) -> Value {
    match raw {
        "" | "~" | "null" | "Null" | "NULL" => return Value::Null,
        "true" | "True" | "TRUE" => return Value::Bool(true),
        "false" | "False" | "FALSE" => return Value::Bool(false),
        _ => {}
    }
    if let Ok(int) = raw.parse::<i64>() {
        return Value::Number(int.into());
    }
    if raw.contains(['.', 'e', 'E']) {
        if let Some(num) = raw.parse::<f64>().ok().and_then(Number::from_f64) {
            return Value::Number(num);
        }
    }
    Value::String(raw.to_string())
}
