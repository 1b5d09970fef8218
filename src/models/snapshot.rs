use std::collections::HashSet;

use thiserror::Error;

use crate::models::{EntityId, project::Project, task::Task, user::User};

/// Everything the last loads returned, viewed together so relationships
/// between the lists can be checked.
pub struct Snapshot<'a> {
    pub projects: &'a [Project],
    pub tasks: &'a [Task],
    pub users: &'a [User],
}

#[derive(Debug, Error, PartialEq)]
pub enum Violation {
    #[error("Task #{task_id} points to project #{project_id}, which does not exist")]
    MissingProject {
        task_id: EntityId,
        project_id: EntityId,
    },

    #[error("Task #{task_id} is assigned to user #{user_id}, who does not exist")]
    MissingAssignee { task_id: EntityId, user_id: EntityId },

    #[error("Project #{project_id} ends before it starts")]
    EndBeforeStart { project_id: EntityId },
}

impl<'a> Snapshot<'a> {
    pub fn new(projects: &'a [Project], tasks: &'a [Task], users: &'a [User]) -> Self {
        Self {
            projects,
            tasks,
            users,
        }
    }

    /// Lists every broken relationship invariant, in list order.
    pub fn violations(&self) -> Vec<Violation> {
        let project_ids: HashSet<EntityId> = self.projects.iter().map(|p| p.id).collect();
        let user_ids: HashSet<EntityId> = self.users.iter().map(|u| u.id).collect();

        let mut violations: Vec<Violation> = self
            .projects
            .iter()
            .filter(|p| !p.has_valid_dates())
            .map(|p| Violation::EndBeforeStart { project_id: p.id })
            .collect();

        for task in self.tasks {
            if !project_ids.contains(&task.project_id) {
                violations.push(Violation::MissingProject {
                    task_id: task.id,
                    project_id: task.project_id,
                });
            }
            if let Some(user_id) = task.assigned_to_id
                && !user_ids.contains(&user_id)
            {
                violations.push(Violation::MissingAssignee {
                    task_id: task.id,
                    user_id,
                });
            }
        }

        violations
    }
}
