use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::models::{EntityId, Named};

#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    /// Server-assigned identifier of the task
    pub id: EntityId,
    /// Name of the task
    pub name: String,
    /// Notes of the task
    pub description: Option<String>,
    /// Progress of the task
    pub status: TaskStatus,
    /// The project this task belongs to
    pub project_id: EntityId,
    /// The user working on this task, if any
    pub assigned_to_id: Option<EntityId>,
    /// Name of the owning project when the payload embeds it
    pub project_name: Option<String>,
    /// Name of the assignee when the payload embeds it
    pub assigned_to_name: Option<String>,
}

impl Named for Task {
    fn id(&self) -> EntityId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TaskStatus {
    #[default]
    ToDo,
    InProgress,
    Done,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [TaskStatus::ToDo, TaskStatus::InProgress, TaskStatus::Done];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::ToDo => "ToDo",
            TaskStatus::InProgress => "InProgress",
            TaskStatus::Done => "Done",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown task status '{0}'. Expected one of: ToDo, InProgress, Done")]
pub struct UnknownStatus(pub String);

impl FromStr for TaskStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Accept the CLI-friendly spellings as well as the wire ones
        match s.trim().to_lowercase().replace(['-', '_', ' '], "").as_str() {
            "todo" => Ok(TaskStatus::ToDo),
            "inprogress" => Ok(TaskStatus::InProgress),
            "done" => Ok(TaskStatus::Done),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}
