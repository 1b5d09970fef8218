use serde_json::{Value, json};

use crate::{
    graph::{DecodeError, ObjectView},
    models::{
        EntityId, date_from_form, date_from_wire, date_to_wire,
        project::{Project, ProjectTask},
    },
    services::{Service, ValidationError, required, tasks::read_status},
};

pub struct Projects;

/// Text fields of the project form, as typed by the user
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectForm {
    pub name: String,
    pub description: String,
    /// `YYYY-MM-DD`
    pub start_date: String,
    /// `YYYY-MM-DD`, empty when the project has no end date
    pub end_date: String,
}

fn wire_date(view: &ObjectView<'_>, field: &'static str) -> Result<Option<jiff::civil::Date>, DecodeError> {
    view.opt_str(field)?
        .map(|raw| {
            date_from_wire(raw).ok_or_else(|| DecodeError::Field {
                entity: Projects::LABEL,
                field,
                reason: format!("'{raw}' is not a date"),
            })
        })
        .transpose()
}

fn project_task(view: ObjectView<'_>) -> Result<ProjectTask, DecodeError> {
    let assigned_to = view
        .object("assignedTo", "user")?
        .map(|user| user.str("name").map(String::from))
        .transpose()?;

    Ok(ProjectTask {
        id: view.int("id")?,
        name: view.str("name")?.to_string(),
        status: read_status(&view)?,
        assigned_to,
    })
}

fn form_date(raw: &str, field: &'static str) -> Result<Option<jiff::civil::Date>, ValidationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    date_from_form(raw)
        .map(Some)
        .ok_or_else(|| ValidationError::InvalidDate {
            field,
            value: raw.to_string(),
        })
}

impl Service for Projects {
    type Entity = Project;
    type Form = ProjectForm;

    const COLLECTION: &'static str = "projects";
    const LABEL: &'static str = "project";

    fn from_view(view: ObjectView<'_>) -> Result<Project, DecodeError> {
        let start_date = wire_date(&view, "startDate")?.ok_or_else(|| DecodeError::Field {
            entity: Self::LABEL,
            field: "startDate",
            reason: String::from("missing required value"),
        })?;

        let tasks = view
            .list("tasks", "task")?
            .into_iter()
            .map(project_task)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Project {
            id: view.int("id")?,
            name: view.str("name")?.to_string(),
            description: view
                .opt_str("description")?
                .filter(|d| !d.trim().is_empty())
                .map(String::from),
            start_date,
            end_date: wire_date(&view, "endDate")?,
            tasks,
        })
    }

    fn to_form(project: &Project) -> ProjectForm {
        ProjectForm {
            name: project.name.clone(),
            description: project.description.clone().unwrap_or_default(),
            start_date: project.start_date.to_string(),
            end_date: project
                .end_date
                .map(|d| d.to_string())
                .unwrap_or_default(),
        }
    }

    fn body(form: &ProjectForm, id: Option<EntityId>) -> Result<Value, ValidationError> {
        let name = required(&form.name, "Project name")?;
        let start_date = form_date(&form.start_date, "start date")?
            .ok_or(ValidationError::MissingField("Start date"))?;
        let end_date = form_date(&form.end_date, "end date")?;

        if let Some(end) = end_date
            && end < start_date
        {
            return Err(ValidationError::EndBeforeStart {
                start: start_date,
                end,
            });
        }

        let mut body = json!({
            "name": name,
            "description": form.description,
            "startDate": date_to_wire(start_date),
            "endDate": end_date.map(date_to_wire),
        });
        if let Some(id) = id {
            body["id"] = json!(id);
        }
        Ok(body)
    }
}
