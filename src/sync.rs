//! Keeps one entity list, one edit form and the remote store in step.
//!
//! Every successful mutation is followed by a full reload, so the list
//! always mirrors what the remote returned last. Nothing is merged locally.

use std::fmt;

use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    graph::{DecodeError, DecodeOptions, decode_graph_with},
    models::{EntityId, Named},
    remote::{Remote, RemoteError},
    services::{Service, ValidationError},
};

#[derive(Debug, Clone, PartialEq)]
pub enum ListState<E> {
    Idle,
    Loading,
    /// The last fetch succeeded. An empty list is not a failure.
    Ready(Vec<E>),
    /// The last fetch failed; the message is shown in place of the list
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Creating,
    Editing(EntityId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Update,
    Delete,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
        };
        write!(f, "{verb}")
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Failed to fetch {label}s. {source}")]
    Remote {
        label: &'static str,
        source: RemoteError,
    },

    #[error("Failed to read {label}s. {source}")]
    Decode {
        label: &'static str,
        source: DecodeError,
    },
}

#[derive(Debug, Error)]
#[error("Failed to {action} {label}: {source}")]
pub struct MutationError {
    pub action: Action,
    pub label: &'static str,
    pub source: RemoteError,
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Mutation(#[from] MutationError),
}

/// Answer to "Are you sure you want to delete this …?"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Declined,
}

impl From<bool> for Confirmation {
    fn from(confirmed: bool) -> Self {
        if confirmed {
            Confirmation::Confirmed
        } else {
            Confirmation::Declined
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    Declined,
}

pub struct Controller<'r, S: Service> {
    remote: &'r dyn Remote,
    options: DecodeOptions,
    list: ListState<S::Entity>,
    form: S::Form,
    mode: FormMode,
    issues: Vec<DecodeError>,
}

impl<'r, S: Service> Controller<'r, S> {
    pub fn new(remote: &'r dyn Remote) -> Self {
        Self::with_options(remote, DecodeOptions::default())
    }

    pub fn with_options(remote: &'r dyn Remote, options: DecodeOptions) -> Self {
        Self {
            remote,
            options,
            list: ListState::Idle,
            form: S::Form::default(),
            mode: FormMode::Creating,
            issues: Vec::new(),
        }
    }

    pub fn state(&self) -> &ListState<S::Entity> {
        &self.list
    }

    /// The loaded records; empty unless the last load succeeded.
    pub fn entities(&self) -> &[S::Entity] {
        match &self.list {
            ListState::Ready(entities) => entities,
            _ => &[],
        }
    }

    pub fn form(&self) -> &S::Form {
        &self.form
    }

    pub fn mode(&self) -> FormMode {
        self.mode
    }

    /// References the last load had to drop
    pub fn issues(&self) -> &[DecodeError] {
        &self.issues
    }

    /// Message to show instead of the list, if any.
    pub fn notice(&self) -> Option<String> {
        match &self.list {
            ListState::Idle => None,
            ListState::Loading => Some(format!("Loading {}s...", S::LABEL)),
            ListState::Ready(entities) if entities.is_empty() => Some(format!(
                "No {label}s found. Please add a {label} or check the backend.",
                label = S::LABEL
            )),
            ListState::Ready(_) => None,
            ListState::Failed(message) => Some(message.clone()),
        }
    }

    pub fn find(&self, id: EntityId) -> Option<&S::Entity> {
        self.entities().iter().find(|entity| entity.id() == id)
    }

    /// Replaces the list with the remote's current collection and returns
    /// how many records it holds.
    pub fn load(&mut self) -> Result<usize, FetchError> {
        self.list = ListState::Loading;
        debug!(collection = S::COLLECTION, "Loading collection");

        match self.fetch() {
            Ok((entities, issues)) => {
                let count = entities.len();
                debug!(collection = S::COLLECTION, count, "Loaded collection");
                self.list = ListState::Ready(entities);
                self.issues = issues;
                Ok(count)
            }
            Err(err) => {
                warn!(collection = S::COLLECTION, error = %err, "Load failed");
                self.list = ListState::Failed(err.to_string());
                self.issues.clear();
                Err(err)
            }
        }
    }

    fn fetch(&self) -> Result<(Vec<S::Entity>, Vec<DecodeError>), FetchError> {
        let decode_failed = |source| FetchError::Decode {
            label: S::LABEL,
            source,
        };

        let raw = self
            .remote
            .fetch(S::COLLECTION)
            .map_err(|source| FetchError::Remote {
                label: S::LABEL,
                source,
            })?;
        let decoded = decode_graph_with(&raw, self.options).map_err(decode_failed)?;
        let entities = decoded
            .graph
            .collection(&decoded.root, S::LABEL)
            .map_err(decode_failed)?
            .into_iter()
            .map(S::from_view)
            .collect::<Result<Vec<_>, _>>()
            .map_err(decode_failed)?;

        Ok((entities, decoded.issues))
    }

    /// Reloads after a mutation. A failed reload is reported through the
    /// list state, not to the caller of the mutation.
    fn resync(&mut self) {
        let _ = self.load();
    }

    /// Saves the form: creates a record, or replaces the one being edited.
    ///
    /// The form is kept as given when validation or the remote call fails.
    pub fn submit(&mut self, form: S::Form) -> Result<(), SubmitError> {
        self.form = form;

        let id = match self.mode {
            FormMode::Creating => None,
            FormMode::Editing(id) => Some(id),
        };
        let body = S::body(&self.form, id)?;

        let (action, result) = match id {
            None => (Action::Create, self.remote.create(S::COLLECTION, &body)),
            Some(id) => (Action::Update, self.remote.update(S::COLLECTION, id, &body)),
        };
        if let Err(source) = result {
            warn!(collection = S::COLLECTION, %action, error = %source, "Mutation failed");
            return Err(MutationError {
                action,
                label: S::LABEL,
                source,
            }
            .into());
        }
        debug!(collection = S::COLLECTION, %action, "Mutation applied");

        self.cancel_edit();
        self.resync();
        Ok(())
    }

    pub fn begin_edit(&mut self, entity: &S::Entity) {
        self.form = S::to_form(entity);
        self.mode = FormMode::Editing(entity.id());
    }

    pub fn cancel_edit(&mut self) {
        self.form = S::Form::default();
        self.mode = FormMode::Creating;
    }

    /// Deletes a record once the caller has confirmed it.
    pub fn remove(
        &mut self,
        id: EntityId,
        confirmation: Confirmation,
    ) -> Result<RemoveOutcome, MutationError> {
        if confirmation == Confirmation::Declined {
            return Ok(RemoveOutcome::Declined);
        }

        self.remote
            .delete(S::COLLECTION, id)
            .map_err(|source| {
                warn!(collection = S::COLLECTION, id, error = %source, "Delete failed");
                MutationError {
                    action: Action::Delete,
                    label: S::LABEL,
                    source,
                }
            })?;
        debug!(collection = S::COLLECTION, id, "Deleted record");

        if self.mode == FormMode::Editing(id) {
            self.cancel_edit();
        }
        self.resync();
        Ok(RemoveOutcome::Removed)
    }
}
