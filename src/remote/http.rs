use std::time::Duration;

use serde_json::Value;
use tracing::debug;
use ureq::{Agent, AgentBuilder};

use crate::{
    models::EntityId,
    remote::{Remote, RemoteError},
};

/// Remote backed by the JSON HTTP API.
pub struct HttpRemote {
    agent: Agent,
    base_url: String,
}

impl HttpRemote {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let agent = AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn collection_url(&self, collection: &str) -> String {
        format!("{}/{}", self.base_url, collection)
    }

    fn item_url(&self, collection: &str, id: EntityId) -> String {
        format!("{}/{}/{}", self.base_url, collection, id)
    }
}

fn map_error(url: &str, error: ureq::Error) -> RemoteError {
    match error {
        ureq::Error::Status(status, response) => RemoteError::Status {
            status,
            details: response.into_string().unwrap_or_default(),
        },
        ureq::Error::Transport(transport) => RemoteError::Unreachable {
            url: url.to_string(),
            reason: transport.to_string(),
        },
    }
}

impl Remote for HttpRemote {
    fn fetch(&self, collection: &str) -> Result<Value, RemoteError> {
        let url = self.collection_url(collection);
        debug!(%url, "GET");
        let response = self
            .agent
            .get(&url)
            .set("Accept", "application/json")
            .call()
            .map_err(|e| map_error(&url, e))?;
        response.into_json::<Value>().map_err(|e| RemoteError::Body {
            url,
            reason: e.to_string(),
        })
    }

    fn create(&self, collection: &str, body: &Value) -> Result<(), RemoteError> {
        let url = self.collection_url(collection);
        debug!(%url, "POST");
        self.agent
            .post(&url)
            .send_json(body)
            .map_err(|e| map_error(&url, e))?;
        Ok(())
    }

    fn update(&self, collection: &str, id: EntityId, body: &Value) -> Result<(), RemoteError> {
        let url = self.item_url(collection, id);
        debug!(%url, "PUT");
        self.agent
            .put(&url)
            .send_json(body)
            .map_err(|e| map_error(&url, e))?;
        Ok(())
    }

    fn delete(&self, collection: &str, id: EntityId) -> Result<(), RemoteError> {
        let url = self.item_url(collection, id);
        debug!(%url, "DELETE");
        self.agent
            .delete(&url)
            .call()
            .map_err(|e| map_error(&url, e))?;
        Ok(())
    }
}
