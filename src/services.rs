use serde_json::Value;
use thiserror::Error;

use crate::{
    graph::{DecodeError, ObjectView},
    models::{EntityId, Named},
};

pub mod projects;
pub mod tasks;
pub mod users;

/// Everything the sync controller needs to know about one record type.
pub trait Service {
    type Entity: Named + Clone;
    type Form: Clone + Default + PartialEq + std::fmt::Debug;

    /// Path segment of the collection on the remote
    const COLLECTION: &'static str;
    /// Singular, lowercase name used in messages
    const LABEL: &'static str;

    /// Projects a decoded object into an entity.
    fn from_view(view: ObjectView<'_>) -> Result<Self::Entity, DecodeError>;

    /// Copies an entity into an editable form.
    fn to_form(entity: &Self::Entity) -> Self::Form;

    /// Validates the form and builds the plain request body. `id` is set
    /// when the body replaces an existing record.
    fn body(form: &Self::Form, id: Option<EntityId>) -> Result<Value, ValidationError>;
}

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("Invalid {field} '{value}'. Expected a date like 2025-03-01")]
    InvalidDate { field: &'static str, value: String },

    #[error("End date {end} is before start date {start}")]
    EndBeforeStart {
        start: jiff::civil::Date,
        end: jiff::civil::Date,
    },
}

pub(crate) fn required<'a>(value: &'a str, field: &'static str) -> Result<&'a str, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ValidationError::MissingField(field))
    } else {
        Ok(trimmed)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum LookupError {
    #[error("No {entity} matches '{query}'")]
    NotFound { entity: &'static str, query: String },

    #[error("The {entity} name '{query}' is ambiguous. Multiple matches found: {}", .names.join(", "))]
    Ambiguous {
        entity: &'static str,
        query: String,
        names: Vec<String>,
    },
}

/// Picks one record by id or by a case-insensitive name fragment.
///
/// A numeric query is tried as an id first. An exact name match wins over
/// partial matches.
pub fn find_by_id_or_name<'a, T: Named>(
    items: &'a [T],
    query: &str,
    entity: &'static str,
) -> Result<&'a T, LookupError> {
    let query = query.trim();
    if let Ok(id) = query.parse::<EntityId>()
        && let Some(item) = items.iter().find(|item| item.id() == id)
    {
        return Ok(item);
    }

    let needle = query.to_lowercase();
    if let Some(item) = items.iter().find(|item| item.name().to_lowercase() == needle) {
        return Ok(item);
    }

    let matching: Vec<&T> = items
        .iter()
        .filter(|item| item.name().to_lowercase().contains(&needle))
        .collect();

    match matching.as_slice() {
        [] => Err(LookupError::NotFound {
            entity,
            query: query.to_string(),
        }),
        [item] => Ok(*item),
        _ => Err(LookupError::Ambiguous {
            entity,
            query: query.to_string(),
            names: matching.iter().map(|item| item.name().to_string()).collect(),
        }),
    }
}
