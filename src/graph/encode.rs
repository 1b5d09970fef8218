use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::graph::{Graph, GraphValue, ID_FIELD, NodeId, REF_FIELD, VALUES_FIELD};

struct Encoder<'g> {
    graph: &'g Graph,
    ids: HashMap<NodeId, String>,
}

/// Flattens a graph into the reference-tagged wire form.
///
/// Every object gets an `$id` the first time it is reached; later
/// occurrences of the same node become `{"$ref": id}`. Lists are always
/// wrapped in a `$values` envelope, empty ones included.
pub fn encode_graph(graph: &Graph, root: &GraphValue) -> Value {
    let mut encoder = Encoder {
        graph,
        ids: HashMap::new(),
    };
    encoder.value(root)
}

impl Encoder<'_> {
    fn value(&mut self, value: &GraphValue) -> Value {
        match value {
            GraphValue::Null => Value::Null,
            GraphValue::Bool(b) => Value::Bool(*b),
            GraphValue::Number(n) => Value::Number(n.clone()),
            GraphValue::String(s) => Value::String(s.clone()),
            GraphValue::List(items) => {
                let values = items.iter().map(|item| self.value(item)).collect();
                let mut envelope = Map::new();
                envelope.insert(VALUES_FIELD.to_string(), Value::Array(values));
                Value::Object(envelope)
            }
            GraphValue::Object(node) => self.object(*node),
        }
    }

    fn object(&mut self, node: NodeId) -> Value {
        if let Some(id) = self.ids.get(&node) {
            let mut reference = Map::new();
            reference.insert(REF_FIELD.to_string(), Value::String(id.clone()));
            return Value::Object(reference);
        }

        let Some(fields) = self.graph.fields(node) else {
            return Value::Null;
        };

        let id = (self.ids.len() + 1).to_string();
        self.ids.insert(node, id.clone());

        let mut map = Map::new();
        map.insert(ID_FIELD.to_string(), Value::String(id));
        for (key, value) in fields {
            let encoded = self.value(value);
            map.insert(key.clone(), encoded);
        }
        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::decode_graph;
    use serde_json::json;

    /// Walks two graphs side by side, checking equal fields and that shared
    /// nodes in one are shared in the other.
    fn assert_isomorphic(
        left: (&Graph, &GraphValue),
        right: (&Graph, &GraphValue),
        pairs: &mut HashMap<NodeId, NodeId>,
    ) {
        match (left.1, right.1) {
            (GraphValue::Object(a), GraphValue::Object(b)) => {
                if let Some(seen) = pairs.get(a) {
                    assert_eq!(seen, b, "sharing structure differs");
                    return;
                }
                assert!(
                    !pairs.values().any(|v| v == b),
                    "two distinct nodes were coalesced"
                );
                pairs.insert(*a, *b);
                let fa = left.0.fields(*a).unwrap();
                let fb = right.0.fields(*b).unwrap();
                assert_eq!(
                    fa.keys().collect::<Vec<_>>(),
                    fb.keys().collect::<Vec<_>>()
                );
                for (key, value) in fa {
                    assert_isomorphic((left.0, value), (right.0, &fb[key]), pairs);
                }
            }
            (GraphValue::List(a), GraphValue::List(b)) => {
                assert_eq!(a.len(), b.len());
                for (x, y) in a.iter().zip(b.iter()) {
                    assert_isomorphic((left.0, x), (right.0, y), pairs);
                }
            }
            (a, b) => assert_eq!(a, b),
        }
    }

    fn project_graph() -> (Graph, GraphValue) {
        let mut graph = Graph::new();
        let project = graph.add_object();
        let ada = graph.add_object();
        let first = graph.add_object();
        let second = graph.add_object();

        graph.set_field(ada, "id", 3_i64.into());
        graph.set_field(ada, "name", "Ada".into());

        graph.set_field(project, "id", 1_i64.into());
        graph.set_field(project, "name", "Apollo".into());
        graph.set_field(project, "description", GraphValue::Null);
        graph.set_field(
            project,
            "tasks",
            GraphValue::list(vec![GraphValue::Object(first), GraphValue::Object(second)]),
        );

        for (task, id) in [(first, 10_i64), (second, 11_i64)] {
            graph.set_field(task, "id", id.into());
            graph.set_field(task, "name", "Same name".into());
            graph.set_field(task, "project", GraphValue::Object(project));
            graph.set_field(task, "assignedTo", GraphValue::Object(ada));
            graph.set_field(task, "labels", GraphValue::list(vec![]));
        }

        let root = GraphValue::list(vec![GraphValue::Object(project), GraphValue::Object(ada)]);
        (graph, root)
    }

    #[test]
    fn test_round_trip_preserves_values_and_sharing() {
        let (graph, root) = project_graph();

        let wire = encode_graph(&graph, &root);
        let decoded = decode_graph(&wire).unwrap();

        assert!(decoded.issues.is_empty());
        assert_eq!(decoded.graph.len(), graph.len());
        assert_isomorphic(
            (&graph, &root),
            (&decoded.graph, &decoded.root),
            &mut HashMap::new(),
        );
    }

    #[test]
    fn test_repeat_occurrences_become_references() {
        let (graph, root) = project_graph();

        let wire = encode_graph(&graph, &root);

        let project = &wire["$values"][0];
        assert_eq!(project["$id"], json!("1"));
        let first = &project["tasks"]["$values"][0];
        assert_eq!(first["project"], json!({"$ref": "1"}));
        let ada_id = first["assignedTo"]["$id"].clone();
        assert_eq!(
            project["tasks"]["$values"][1]["assignedTo"],
            json!({"$ref": ada_id})
        );
        assert_eq!(wire["$values"][1], json!({"$ref": ada_id}));
    }

    #[test]
    fn test_equal_but_distinct_objects_are_not_coalesced() {
        let mut graph = Graph::new();
        let a = graph.add_object();
        let b = graph.add_object();
        graph.set_field(a, "name", "twin".into());
        graph.set_field(b, "name", "twin".into());
        let root = GraphValue::list(vec![GraphValue::Object(a), GraphValue::Object(b)]);

        let wire = encode_graph(&graph, &root);

        assert_eq!(
            wire,
            json!({"$values": [
                {"$id": "1", "name": "twin"},
                {"$id": "2", "name": "twin"}
            ]})
        );
    }

    #[test]
    fn test_empty_lists_and_nulls_keep_their_shape() {
        let mut graph = Graph::new();
        let task = graph.add_object();
        graph.set_field(task, "assignedTo", GraphValue::Null);
        graph.set_field(task, "labels", GraphValue::list(vec![]));

        let wire = encode_graph(&graph, &GraphValue::Object(task));

        assert_eq!(
            wire,
            json!({"$id": "1", "assignedTo": null, "labels": {"$values": []}})
        );
    }
}
