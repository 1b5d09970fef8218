use jiff::civil::Date;

use crate::models::{EntityId, Named, task::TaskStatus};

#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    /// Server-assigned identifier of the project
    pub id: EntityId,
    /// Name of the project
    pub name: String,
    /// Free-form description of the project
    pub description: Option<String>,
    /// Day the project starts
    pub start_date: Date,
    /// Day the project ends, never before `start_date` when valid
    pub end_date: Option<Date>,
    /// Tasks attached to the project, in the order the remote sent them
    pub tasks: Vec<ProjectTask>,
}

impl Named for Project {
    fn id(&self) -> EntityId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Project {
    pub fn has_valid_dates(&self) -> bool {
        self.end_date.is_none_or(|end| end >= self.start_date)
    }
}

/// The slice of a task shown inside a project listing
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectTask {
    pub id: EntityId,
    pub name: String,
    pub status: TaskStatus,
    /// Display name of the assignee, if the task is assigned
    pub assigned_to: Option<String>,
}
