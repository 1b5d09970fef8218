//! In-process remote that owns its records.
//!
//! Reads are served the way the HTTP API serves them: related records are
//! linked (project ↔ tasks, task → assignee) and the result is flattened
//! with the reference-tagged encoder. Writes apply the relational rules of
//! the backing store: a task needs an existing project, deleting a project
//! deletes its tasks, deleting a user unassigns their tasks.

use std::{
    cell::RefCell,
    collections::{BTreeMap, HashMap},
};

use serde_json::{Map, Value};
use tracing::debug;

use crate::{
    graph::{Graph, GraphValue, NodeId, encode_graph},
    models::{EntityId, NEW_ENTITY_ID},
    remote::{Remote, RemoteError},
};

const PROJECTS: &str = "projects";
const TASKS: &str = "tasks";
const USERS: &str = "users";

type Record = Map<String, Value>;

#[derive(Default)]
struct Tables {
    projects: Vec<Record>,
    tasks: Vec<Record>,
    users: Vec<Record>,
    last_ids: BTreeMap<&'static str, EntityId>,
}

#[derive(Default)]
pub struct MemoryRemote {
    tables: RefCell<Tables>,
}

fn bad_request(details: impl Into<String>) -> RemoteError {
    RemoteError::Status {
        status: 400,
        details: details.into(),
    }
}

fn not_found(details: impl Into<String>) -> RemoteError {
    RemoteError::Status {
        status: 404,
        details: details.into(),
    }
}

fn collection_name(collection: &str) -> Result<&'static str, RemoteError> {
    match collection {
        PROJECTS => Ok(PROJECTS),
        TASKS => Ok(TASKS),
        USERS => Ok(USERS),
        other => Err(not_found(format!("No collection named '{other}'"))),
    }
}

fn record_id(record: &Record) -> EntityId {
    record.get("id").and_then(Value::as_i64).unwrap_or_default()
}

fn int_field(record: &Record, field: &str) -> Option<EntityId> {
    record.get(field).and_then(Value::as_i64)
}

fn require_text(record: &Record, field: &str, label: &str) -> Result<(), RemoteError> {
    match record.get(field).and_then(Value::as_str) {
        Some(text) if !text.trim().is_empty() => Ok(()),
        _ => Err(bad_request(format!("The {label} field is required."))),
    }
}

fn plain(value: &Value) -> GraphValue {
    match value {
        Value::Null | Value::Object(_) => GraphValue::Null,
        Value::Bool(b) => GraphValue::Bool(*b),
        Value::Number(n) => GraphValue::Number(n.clone()),
        Value::String(s) => GraphValue::String(s.clone()),
        Value::Array(items) => GraphValue::List(items.iter().map(plain).collect()),
    }
}

fn add_record(graph: &mut Graph, record: &Record) -> NodeId {
    let node = graph.add_object();
    for (key, value) in record {
        graph.set_field(node, key.as_str(), plain(value));
    }
    node
}

impl Tables {
    fn table(&self, collection: &'static str) -> &Vec<Record> {
        match collection {
            PROJECTS => &self.projects,
            TASKS => &self.tasks,
            _ => &self.users,
        }
    }

    fn table_mut(&mut self, collection: &'static str) -> &mut Vec<Record> {
        match collection {
            PROJECTS => &mut self.projects,
            TASKS => &mut self.tasks,
            _ => &mut self.users,
        }
    }

    fn exists(&self, collection: &'static str, id: EntityId) -> bool {
        self.table(collection).iter().any(|r| record_id(r) == id)
    }

    fn next_id(&mut self, collection: &'static str) -> EntityId {
        let last = self.last_ids.entry(collection).or_default();
        *last += 1;
        *last
    }

    fn validate(&self, collection: &'static str, record: &Record) -> Result<(), RemoteError> {
        match collection {
            PROJECTS => {
                require_text(record, "name", "Name")?;
                require_text(record, "startDate", "StartDate")
            }
            TASKS => {
                require_text(record, "name", "Name")?;
                let project_id = int_field(record, "projectId")
                    .ok_or_else(|| bad_request("The ProjectId field is required."))?;
                if !self.exists(PROJECTS, project_id) {
                    return Err(bad_request(format!("Project {project_id} does not exist.")));
                }
                if let Some(user_id) = int_field(record, "assignedToId")
                    && !self.exists(USERS, user_id)
                {
                    return Err(bad_request(format!("User {user_id} does not exist.")));
                }
                Ok(())
            }
            _ => {
                require_text(record, "name", "Name")?;
                require_text(record, "email", "Email")
            }
        }
    }

    /// Links every record into one graph and returns the roots of the
    /// requested collection.
    fn render(&self, collection: &'static str) -> Value {
        let mut graph = Graph::new();

        let users: Vec<(EntityId, NodeId)> = self
            .users
            .iter()
            .map(|r| (record_id(r), add_record(&mut graph, r)))
            .collect();
        let user_nodes: HashMap<EntityId, NodeId> = users.iter().copied().collect();

        let projects: Vec<(EntityId, NodeId)> = self
            .projects
            .iter()
            .map(|r| (record_id(r), add_record(&mut graph, r)))
            .collect();
        let project_nodes: HashMap<EntityId, NodeId> = projects.iter().copied().collect();

        let mut project_tasks: HashMap<EntityId, Vec<GraphValue>> = HashMap::new();
        let mut tasks = Vec::with_capacity(self.tasks.len());
        for record in &self.tasks {
            let node = add_record(&mut graph, record);
            if let Some(project_id) = int_field(record, "projectId")
                && let Some(project) = project_nodes.get(&project_id)
            {
                graph.set_field(node, "project", GraphValue::Object(*project));
                project_tasks
                    .entry(project_id)
                    .or_default()
                    .push(GraphValue::Object(node));
            }
            let assignee = int_field(record, "assignedToId")
                .and_then(|id| user_nodes.get(&id))
                .map_or(GraphValue::Null, |user| GraphValue::Object(*user));
            graph.set_field(node, "assignedTo", assignee);
            tasks.push(GraphValue::Object(node));
        }

        for (id, node) in &projects {
            let linked = project_tasks.remove(id).unwrap_or_default();
            graph.set_field(*node, "tasks", GraphValue::list(linked));
        }

        let roots = match collection {
            PROJECTS => projects
                .iter()
                .map(|(_, node)| GraphValue::Object(*node))
                .collect(),
            TASKS => tasks,
            _ => users
                .iter()
                .map(|(_, node)| GraphValue::Object(*node))
                .collect(),
        };
        encode_graph(&graph, &GraphValue::list(roots))
    }
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a new record and returns the id it was given.
    pub fn insert(&self, collection: &str, body: &Value) -> Result<EntityId, RemoteError> {
        let collection = collection_name(collection)?;
        let mut record = body
            .as_object()
            .cloned()
            .ok_or_else(|| bad_request("Body must be a JSON object."))?;
        if int_field(&record, "id").is_some_and(|id| id != NEW_ENTITY_ID) {
            return Err(bad_request("Identifiers are assigned by the server."));
        }

        let mut tables = self.tables.borrow_mut();
        tables.validate(collection, &record)?;

        let id = tables.next_id(collection);
        record.insert(String::from("id"), Value::from(id));
        tables.table_mut(collection).push(record);
        debug!(collection, id, "Inserted record");
        Ok(id)
    }

    pub fn len(&self, collection: &str) -> usize {
        collection_name(collection)
            .map(|name| self.tables.borrow().table(name).len())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        let tables = self.tables.borrow();
        tables.projects.is_empty() && tables.tasks.is_empty() && tables.users.is_empty()
    }
}

impl Remote for MemoryRemote {
    fn fetch(&self, collection: &str) -> Result<Value, RemoteError> {
        let collection = collection_name(collection)?;
        Ok(self.tables.borrow().render(collection))
    }

    fn create(&self, collection: &str, body: &Value) -> Result<(), RemoteError> {
        self.insert(collection, body).map(|_| ())
    }

    fn update(&self, collection: &str, id: EntityId, body: &Value) -> Result<(), RemoteError> {
        let collection = collection_name(collection)?;
        let record = body
            .as_object()
            .cloned()
            .ok_or_else(|| bad_request("Body must be a JSON object."))?;
        if int_field(&record, "id") != Some(id) {
            return Err(bad_request("Route id and body id do not match."));
        }

        let mut tables = self.tables.borrow_mut();
        tables.validate(collection, &record)?;

        let slot = tables
            .table_mut(collection)
            .iter_mut()
            .find(|r| record_id(r) == id)
            .ok_or_else(|| not_found(format!("No {collection} record with id {id}.")))?;
        *slot = record;
        Ok(())
    }

    fn delete(&self, collection: &str, id: EntityId) -> Result<(), RemoteError> {
        let collection = collection_name(collection)?;
        let mut tables = self.tables.borrow_mut();

        let table = tables.table_mut(collection);
        let before = table.len();
        table.retain(|r| record_id(r) != id);
        if table.len() == before {
            return Err(not_found(format!("No {collection} record with id {id}.")));
        }

        match collection {
            PROJECTS => tables
                .tasks
                .retain(|t| int_field(t, "projectId") != Some(id)),
            USERS => {
                for task in tables
                    .tasks
                    .iter_mut()
                    .filter(|t| int_field(t, "assignedToId") == Some(id))
                {
                    task.insert(String::from("assignedToId"), Value::Null);
                }
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::decode_graph;
    use serde_json::json;

    fn seeded() -> MemoryRemote {
        let remote = MemoryRemote::new();
        remote
            .insert(USERS, &json!({"name": "Ada", "email": "ada@example.com", "role": "Admin"}))
            .unwrap();
        remote
            .insert(PROJECTS, &json!({"name": "Apollo", "startDate": "2024-01-01T00:00:00"}))
            .unwrap();
        remote
            .insert(TASKS, &json!({"name": "Design", "status": "ToDo", "projectId": 1, "assignedToId": 1}))
            .unwrap();
        remote
            .insert(TASKS, &json!({"name": "Build", "status": "Done", "projectId": 1, "assignedToId": 1}))
            .unwrap();
        remote
    }

    #[test]
    fn test_fetch_links_tasks_back_to_their_project() {
        let remote = seeded();

        let wire = remote.fetch(PROJECTS).unwrap();

        let project = &wire["$values"][0];
        assert_eq!(project["name"], json!("Apollo"));
        let tasks = &project["tasks"]["$values"];
        assert_eq!(tasks[0]["project"], json!({"$ref": project["$id"]}));
        assert_eq!(tasks[1]["project"], json!({"$ref": project["$id"]}));
        assert_eq!(tasks[1]["assignedTo"], json!({"$ref": tasks[0]["assignedTo"]["$id"]}));

        let decoded = decode_graph(&wire).unwrap();
        assert!(decoded.issues.is_empty());
    }

    #[test]
    fn test_fetch_empty_collection_is_an_empty_envelope() {
        let remote = MemoryRemote::new();

        assert_eq!(remote.fetch(USERS).unwrap(), json!({"$values": []}));
        assert!(remote.is_empty());
    }

    #[test]
    fn test_task_requires_an_existing_project() {
        let remote = MemoryRemote::new();

        match remote.create(TASKS, &json!({"name": "Orphan", "projectId": 4})) {
            Err(RemoteError::Status { status: 400, .. }) => {}
            other => panic!("Expected a 400 status, got {:?}", other),
        }
        assert_eq!(remote.len(TASKS), 0);
    }

    #[test]
    fn test_create_rejects_client_assigned_ids() {
        let remote = MemoryRemote::new();

        let body = json!({"id": 7, "name": "Ada", "email": "ada@example.com", "role": "Admin"});
        match remote.create(USERS, &body) {
            Err(RemoteError::Status { status: 400, .. }) => {}
            other => panic!("Expected a 400 status, got {:?}", other),
        }

        let body = json!({"id": 0, "name": "Ada", "email": "ada@example.com", "role": "Admin"});
        assert_eq!(remote.insert(USERS, &body).unwrap(), 1);
    }

    #[test]
    fn test_update_requires_matching_ids() {
        let remote = seeded();

        let body = json!({"id": 2, "name": "Ada L.", "email": "ada@example.com", "role": "Admin"});
        match remote.update(USERS, 1, &body) {
            Err(RemoteError::Status { status: 400, .. }) => {}
            other => panic!("Expected a 400 status, got {:?}", other),
        }

        let body = json!({"id": 1, "name": "Ada L.", "email": "ada@example.com", "role": "Admin"});
        remote.update(USERS, 1, &body).unwrap();
        assert_eq!(remote.fetch(USERS).unwrap()["$values"][0]["name"], json!("Ada L."));
    }

    #[test]
    fn test_deleting_a_project_deletes_its_tasks() {
        let remote = seeded();

        remote.delete(PROJECTS, 1).unwrap();

        assert_eq!(remote.len(TASKS), 0);
        match remote.delete(PROJECTS, 1) {
            Err(RemoteError::Status { status: 404, .. }) => {}
            other => panic!("Expected a 404 status, got {:?}", other),
        }
    }

    #[test]
    fn test_deleting_a_user_unassigns_their_tasks() {
        let remote = seeded();

        remote.delete(USERS, 1).unwrap();

        let wire = remote.fetch(TASKS).unwrap();
        assert_eq!(wire["$values"][0]["assignedToId"], Value::Null);
        assert_eq!(wire["$values"][0]["assignedTo"], Value::Null);
    }

    #[test]
    fn test_unknown_collection_is_not_found() {
        let remote = MemoryRemote::new();

        match remote.fetch("areas") {
            Err(RemoteError::Status { status: 404, .. }) => {}
            other => panic!("Expected a 404 status, got {:?}", other),
        }
    }
}
