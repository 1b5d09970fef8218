use std::{collections::HashMap, rc::Rc};

use serde_json::{Map, Value};
use tracing::warn;

use crate::graph::{DecodeError, Graph, GraphValue, ID_FIELD, NodeId, REF_FIELD, VALUES_FIELD};

/// What to do with `$`-prefixed metadata the decoder does not understand
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnknownFields {
    #[default]
    Drop,
    Preserve,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DecodeOptions {
    pub unknown_fields: UnknownFields,
    /// Fail on a reference to an unseen id instead of dropping the edge
    pub strict_references: bool,
}

/// Result of one decode pass
#[derive(Debug, Clone)]
pub struct Decoded {
    pub graph: Graph,
    pub root: GraphValue,
    /// Non-fatal problems; each one emptied a single edge of the graph
    pub issues: Vec<DecodeError>,
}

enum Anchor {
    Object(NodeId),
    List(Rc<[GraphValue]>),
}

struct Decoder {
    options: DecodeOptions,
    graph: Graph,
    anchors: HashMap<String, Anchor>,
    issues: Vec<DecodeError>,
}

pub fn decode_graph(raw: &Value) -> Result<Decoded, DecodeError> {
    decode_graph_with(raw, DecodeOptions::default())
}

pub fn decode_graph_with(raw: &Value, options: DecodeOptions) -> Result<Decoded, DecodeError> {
    let mut decoder = Decoder {
        options,
        graph: Graph::new(),
        anchors: HashMap::new(),
        issues: Vec::new(),
    };
    let root = decoder.value(raw)?;
    Ok(Decoded {
        graph: decoder.graph,
        root,
        issues: decoder.issues,
    })
}

fn marker_id(raw: &Value, marker: &'static str) -> Result<String, DecodeError> {
    match raw {
        Value::String(id) => Ok(id.clone()),
        Value::Number(n) if n.is_u64() || n.is_i64() => Ok(n.to_string()),
        other => Err(DecodeError::InvalidMarker {
            marker,
            found: other.to_string(),
        }),
    }
}

impl Decoder {
    fn value(&mut self, raw: &Value) -> Result<GraphValue, DecodeError> {
        match raw {
            Value::Null => Ok(GraphValue::Null),
            Value::Bool(b) => Ok(GraphValue::Bool(*b)),
            Value::Number(n) => Ok(GraphValue::Number(n.clone())),
            Value::String(s) => Ok(GraphValue::String(s.clone())),
            Value::Array(items) => self.items(items).map(GraphValue::List),
            Value::Object(map) => {
                if let Some(target) = map.get(REF_FIELD) {
                    let id = marker_id(target, REF_FIELD)?;
                    self.resolve(id)
                } else if map.contains_key(VALUES_FIELD) {
                    self.envelope(map)
                } else {
                    self.object(map)
                }
            }
        }
    }

    fn items(&mut self, items: &[Value]) -> Result<Rc<[GraphValue]>, DecodeError> {
        items.iter().map(|item| self.value(item)).collect()
    }

    fn anchor(&mut self, raw_id: &Value, anchor: Anchor) -> Result<(), DecodeError> {
        let id = marker_id(raw_id, ID_FIELD)?;
        if self.anchors.contains_key(&id) {
            return Err(DecodeError::DuplicateId(id));
        }
        self.anchors.insert(id, anchor);
        Ok(())
    }

    fn resolve(&mut self, id: String) -> Result<GraphValue, DecodeError> {
        match self.anchors.get(&id) {
            Some(Anchor::Object(node)) => Ok(GraphValue::Object(*node)),
            Some(Anchor::List(items)) => Ok(GraphValue::List(Rc::clone(items))),
            None if self.options.strict_references => Err(DecodeError::DanglingReference(id)),
            None => {
                warn!(reference = %id, "Dangling reference in payload, dropping the edge");
                self.issues.push(DecodeError::DanglingReference(id));
                Ok(GraphValue::Null)
            }
        }
    }

    fn envelope(&mut self, map: &Map<String, Value>) -> Result<GraphValue, DecodeError> {
        // A missing or non-sequence payload is an empty collection
        let items: Rc<[GraphValue]> = match map.get(VALUES_FIELD) {
            Some(Value::Array(items)) => self.items(items)?,
            _ => Rc::from(Vec::new()),
        };
        if let Some(raw_id) = map.get(ID_FIELD) {
            self.anchor(raw_id, Anchor::List(Rc::clone(&items)))?;
        }
        Ok(GraphValue::List(items))
    }

    fn object(&mut self, map: &Map<String, Value>) -> Result<GraphValue, DecodeError> {
        let node = self.graph.add_object();
        // Registered before the fields so that cycles back to this object resolve
        if let Some(raw_id) = map.get(ID_FIELD) {
            self.anchor(raw_id, Anchor::Object(node))?;
        }

        for (key, raw) in map {
            if key == ID_FIELD {
                continue;
            }
            if key.starts_with('$') && self.options.unknown_fields == UnknownFields::Drop {
                continue;
            }
            let value = self.value(raw)?;
            self.graph.set_field(node, key.as_str(), value);
        }

        Ok(GraphValue::Object(node))
    }
}
