use serde_json::Value;
use thiserror::Error;

use crate::models::EntityId;

pub mod http;
#[cfg(test)]
pub mod memory;

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("Status: {status}, Details: {details}")]
    Status { status: u16, details: String },

    #[error("No response received from '{url}'. Check if the backend is running. ({reason})")]
    Unreachable { url: String, reason: String },

    #[error("Invalid response body from '{url}': {reason}")]
    Body { url: String, reason: String },
}

/// The service that owns the records.
///
/// Collections are addressed by their path segment (`projects`, `tasks`,
/// `users`). Calls block until the service answers or the transport gives up.
pub trait Remote {
    /// Returns the whole collection in reference-tagged form.
    fn fetch(&self, collection: &str) -> Result<Value, RemoteError>;
    /// Creates a record from a plain body without id.
    fn create(&self, collection: &str, body: &Value) -> Result<(), RemoteError>;
    /// Replaces a record with a plain body carrying the same id.
    fn update(&self, collection: &str, id: EntityId, body: &Value) -> Result<(), RemoteError>;
    fn delete(&self, collection: &str, id: EntityId) -> Result<(), RemoteError>;
}
