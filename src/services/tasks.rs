use serde_json::{Value, json};

use crate::{
    graph::{DecodeError, ObjectView},
    models::{
        EntityId,
        project::Project,
        task::{Task, TaskStatus, UnknownStatus},
        user::User,
    },
    services::{LookupError, Service, ValidationError, find_by_id_or_name, required},
};

pub struct Tasks;

#[derive(Debug, Clone, PartialEq)]
pub struct TaskForm {
    pub name: String,
    pub description: String,
    pub status: Option<TaskStatus>,
    /// Selected project; a task cannot be saved without one
    pub project_id: Option<EntityId>,
    /// Selected assignee; `None` means unassigned
    pub assigned_to_id: Option<EntityId>,
}

impl Default for TaskForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            status: Some(TaskStatus::ToDo),
            project_id: None,
            assigned_to_id: None,
        }
    }
}

/// Reads the `status` field. Records stored without one count as `ToDo`.
pub(crate) fn read_status(view: &ObjectView<'_>) -> Result<TaskStatus, DecodeError> {
    match view.opt_str("status")? {
        None => Ok(TaskStatus::default()),
        Some(raw) => raw.parse().map_err(|e: UnknownStatus| DecodeError::Field {
            entity: Tasks::LABEL,
            field: "status",
            reason: e.to_string(),
        }),
    }
}

fn related_name(
    view: &ObjectView<'_>,
    field: &'static str,
    entity: &'static str,
) -> Result<Option<String>, DecodeError> {
    view.object(field, entity)?
        .map(|related| related.str("name").map(String::from))
        .transpose()
}

impl Service for Tasks {
    type Entity = Task;
    type Form = TaskForm;

    const COLLECTION: &'static str = "tasks";
    const LABEL: &'static str = "task";

    fn from_view(view: ObjectView<'_>) -> Result<Task, DecodeError> {
        Ok(Task {
            id: view.int("id")?,
            name: view.str("name")?.to_string(),
            description: view
                .opt_str("description")?
                .filter(|d| !d.trim().is_empty())
                .map(String::from),
            status: read_status(&view)?,
            project_id: view.int("projectId")?,
            assigned_to_id: view.opt_int("assignedToId")?,
            project_name: related_name(&view, "project", "project")?,
            assigned_to_name: related_name(&view, "assignedTo", "user")?,
        })
    }

    fn to_form(task: &Task) -> TaskForm {
        TaskForm {
            name: task.name.clone(),
            description: task.description.clone().unwrap_or_default(),
            status: Some(task.status),
            project_id: Some(task.project_id),
            assigned_to_id: task.assigned_to_id,
        }
    }

    fn body(form: &TaskForm, id: Option<EntityId>) -> Result<Value, ValidationError> {
        let name = required(&form.name, "Task name")?;
        let status = form.status.ok_or(ValidationError::MissingField("Status"))?;
        let project_id = form
            .project_id
            .ok_or(ValidationError::MissingField("Project"))?;

        let mut body = json!({
            "name": name,
            "description": form.description,
            "status": status,
            "projectId": project_id,
            "assignedToId": form.assigned_to_id,
        });
        if let Some(id) = id {
            body["id"] = json!(id);
        }
        Ok(body)
    }
}

/// Read-only view of the lists the task screen depends on.
///
/// The lists are whatever the project and user controllers loaded last;
/// they may lag behind the task list.
#[derive(Clone, Copy)]
pub struct TaskContext<'a> {
    pub projects: &'a [Project],
    pub users: &'a [User],
}

impl<'a> TaskContext<'a> {
    pub fn new(projects: &'a [Project], users: &'a [User]) -> Self {
        Self { projects, users }
    }

    pub fn project_choices(self) -> impl Iterator<Item = (EntityId, &'a str)> {
        self.projects.iter().map(|p| (p.id, p.name.as_str()))
    }

    pub fn user_choices(self) -> impl Iterator<Item = (EntityId, &'a str)> {
        self.users.iter().map(|u| (u.id, u.name.as_str()))
    }

    pub fn resolve_project(&self, query: &str) -> Result<EntityId, LookupError> {
        find_by_id_or_name(self.projects, query, "project").map(|p| p.id)
    }

    pub fn resolve_user(&self, query: &str) -> Result<EntityId, LookupError> {
        find_by_id_or_name(self.users, query, "user").map(|u| u.id)
    }

    /// Name of the task's project, preferring what the payload embedded.
    pub fn project_name(&self, task: &'a Task) -> Option<&'a str> {
        task.project_name.as_deref().or_else(|| {
            self.projects
                .iter()
                .find(|p| p.id == task.project_id)
                .map(|p| p.name.as_str())
        })
    }

    /// Name of the task's assignee, preferring what the payload embedded.
    pub fn assignee_name(&self, task: &'a Task) -> Option<&'a str> {
        let user_id = task.assigned_to_id?;
        task.assigned_to_name.as_deref().or_else(|| {
            self.users
                .iter()
                .find(|u| u.id == user_id)
                .map(|u| u.name.as_str())
        })
    }
}
