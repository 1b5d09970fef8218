use crate::models::{EntityId, Named};

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: EntityId,
    pub name: String,
    /// Contact address; its format is checked by whoever collects it
    pub email: String,
    /// Free-text role label such as "Admin" or "Developer"
    pub role: String,
}

impl Named for User {
    fn id(&self) -> EntityId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}
