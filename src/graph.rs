//! Reference-preserving object graphs.
//!
//! The remote serializes cyclic graphs (a project lists its tasks, each task
//! points back at its project) by giving every object an `$id`, replacing
//! repeat occurrences with `{"$ref": id}` and wrapping collections in
//! `{"$values": [...]}`. Decoded objects live in an arena so that every
//! reference to the same object resolves to the same [`NodeId`].

use std::{collections::BTreeMap, rc::Rc};

use thiserror::Error;
use typed_index_collections::TiVec;

pub mod decode;
pub mod encode;

pub use decode::{DecodeOptions, Decoded, UnknownFields, decode_graph, decode_graph_with};
pub use encode::encode_graph;

pub const ID_FIELD: &str = "$id";
pub const REF_FIELD: &str = "$ref";
pub const VALUES_FIELD: &str = "$values";

/// Identity of an object inside a [`Graph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl From<usize> for NodeId {
    fn from(index: usize) -> Self {
        NodeId(index)
    }
}

impl From<NodeId> for usize {
    fn from(node: NodeId) -> Self {
        node.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GraphValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    /// Shared so that every `$ref` to an envelope reuses the same elements
    List(Rc<[GraphValue]>),
    Object(NodeId),
}

impl GraphValue {
    pub fn list(items: Vec<GraphValue>) -> Self {
        GraphValue::List(items.into())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            GraphValue::Null => "null",
            GraphValue::Bool(_) => "boolean",
            GraphValue::Number(_) => "number",
            GraphValue::String(_) => "string",
            GraphValue::List(_) => "list",
            GraphValue::Object(_) => "object",
        }
    }

    pub fn as_object(&self) -> Option<NodeId> {
        match self {
            GraphValue::Object(node) => Some(*node),
            _ => None,
        }
    }
}

impl From<&str> for GraphValue {
    fn from(value: &str) -> Self {
        GraphValue::String(value.to_string())
    }
}

impl From<i64> for GraphValue {
    fn from(value: i64) -> Self {
        GraphValue::Number(value.into())
    }
}

pub type Fields = BTreeMap<String, GraphValue>;

/// Arena of decoded objects.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: TiVec<NodeId, Fields>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates an empty object and returns its identity.
    pub fn add_object(&mut self) -> NodeId {
        self.nodes.push_and_get_key(Fields::new())
    }

    pub fn set_field(&mut self, node: NodeId, key: impl Into<String>, value: GraphValue) {
        if let Some(fields) = self.nodes.get_mut(node) {
            fields.insert(key.into(), value);
        }
    }

    pub fn fields(&self, node: NodeId) -> Option<&Fields> {
        self.nodes.get(node)
    }

    pub fn field(&self, node: NodeId, key: &str) -> Option<&GraphValue> {
        self.fields(node).and_then(|fields| fields.get(key))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// True for an object holding nothing but `$`-metadata, which is how a
    /// collection serialized without its `$values` decodes.
    fn is_bare(&self, node: NodeId) -> bool {
        self.fields(node)
            .is_some_and(|fields| fields.keys().all(|key| key.starts_with('$')))
    }

    pub fn view(&self, node: NodeId, entity: &'static str) -> ObjectView<'_> {
        ObjectView {
            graph: self,
            node,
            entity,
        }
    }

    /// Views every object of a top-level collection. Positions emptied by a
    /// dangling reference are skipped, and an envelope that lost its
    /// `$values` reads as empty.
    pub fn collection<'g>(
        &'g self,
        root: &GraphValue,
        entity: &'static str,
    ) -> Result<Vec<ObjectView<'g>>, DecodeError> {
        match root {
            GraphValue::List(items) => objects_of(self, items, entity, "<root>"),
            GraphValue::Object(node) if self.is_bare(*node) => Ok(vec![]),
            other => Err(DecodeError::NotACollection {
                entity,
                found: other.kind(),
            }),
        }
    }
}

fn objects_of<'g>(
    graph: &'g Graph,
    items: &[GraphValue],
    entity: &'static str,
    field: &'static str,
) -> Result<Vec<ObjectView<'g>>, DecodeError> {
    items
        .iter()
        .filter(|item| !matches!(item, GraphValue::Null))
        .map(|item| match item {
            GraphValue::Object(node) => Ok(graph.view(*node, entity)),
            other => Err(DecodeError::Field {
                entity,
                field,
                reason: format!("expected a list of objects, found a {}", other.kind()),
            }),
        })
        .collect()
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DecodeError {
    #[error("Reference to object '{0}', which has not been seen yet")]
    DanglingReference(String),

    #[error("Marker '{marker}' must hold a string or integer id, found {found}")]
    InvalidMarker { marker: &'static str, found: String },

    #[error("Object id '{0}' is declared more than once")]
    DuplicateId(String),

    #[error("Expected a collection of {entity}s, found a {found}")]
    NotACollection {
        entity: &'static str,
        found: &'static str,
    },

    #[error("Invalid field '{field}' on {entity}: {reason}")]
    Field {
        entity: &'static str,
        field: &'static str,
        reason: String,
    },
}

/// Typed read access to one object of a graph.
#[derive(Clone, Copy)]
pub struct ObjectView<'g> {
    graph: &'g Graph,
    node: NodeId,
    entity: &'static str,
}

impl<'g> ObjectView<'g> {
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Returns the field value, treating an explicit `null` as absent.
    pub fn get(&self, field: &str) -> Option<&'g GraphValue> {
        match self.graph.field(self.node, field) {
            None | Some(GraphValue::Null) => None,
            Some(value) => Some(value),
        }
    }

    fn invalid(&self, field: &'static str, reason: impl Into<String>) -> DecodeError {
        DecodeError::Field {
            entity: self.entity,
            field,
            reason: reason.into(),
        }
    }

    pub fn int(&self, field: &'static str) -> Result<i64, DecodeError> {
        self.opt_int(field)?
            .ok_or_else(|| self.invalid(field, "missing required value"))
    }

    pub fn opt_int(&self, field: &'static str) -> Result<Option<i64>, DecodeError> {
        match self.get(field) {
            None => Ok(None),
            Some(GraphValue::Number(n)) => n
                .as_i64()
                .map(Some)
                .ok_or_else(|| self.invalid(field, format!("{n} is not an integer"))),
            Some(other) => Err(self.invalid(field, format!("expected a number, found a {}", other.kind()))),
        }
    }

    pub fn str(&self, field: &'static str) -> Result<&'g str, DecodeError> {
        self.opt_str(field)?
            .ok_or_else(|| self.invalid(field, "missing required value"))
    }

    pub fn opt_str(&self, field: &'static str) -> Result<Option<&'g str>, DecodeError> {
        match self.get(field) {
            None => Ok(None),
            Some(GraphValue::String(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(self.invalid(field, format!("expected a string, found a {}", other.kind()))),
        }
    }

    /// Follows a relation to another object.
    pub fn object(
        &self,
        field: &'static str,
        entity: &'static str,
    ) -> Result<Option<ObjectView<'g>>, DecodeError> {
        match self.get(field) {
            None => Ok(None),
            Some(GraphValue::Object(node)) => Ok(Some(self.graph.view(*node, entity))),
            Some(other) => Err(self.invalid(field, format!("expected an object, found a {}", other.kind()))),
        }
    }

    /// Follows a to-many relation. An absent field, or an envelope without
    /// `$values`, is an empty list.
    pub fn list(
        &self,
        field: &'static str,
        entity: &'static str,
    ) -> Result<Vec<ObjectView<'g>>, DecodeError> {
        match self.get(field) {
            None => Ok(vec![]),
            Some(GraphValue::List(items)) => objects_of(self.graph, items, entity, field),
            Some(GraphValue::Object(node)) if self.graph.is_bare(*node) => Ok(vec![]),
            Some(other) => Err(self.invalid(field, format!("expected a list, found a {}", other.kind()))),
        }
    }
}
