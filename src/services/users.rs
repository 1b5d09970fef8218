use serde_json::{Value, json};

use crate::{
    graph::{DecodeError, ObjectView},
    models::{EntityId, user::User},
    services::{Service, ValidationError, required},
};

pub struct Users;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserForm {
    pub name: String,
    pub email: String,
    pub role: String,
}

impl Service for Users {
    type Entity = User;
    type Form = UserForm;

    const COLLECTION: &'static str = "users";
    const LABEL: &'static str = "user";

    fn from_view(view: ObjectView<'_>) -> Result<User, DecodeError> {
        Ok(User {
            id: view.int("id")?,
            name: view.str("name")?.to_string(),
            email: view.opt_str("email")?.unwrap_or_default().to_string(),
            role: view.opt_str("role")?.unwrap_or_default().to_string(),
        })
    }

    fn to_form(user: &User) -> UserForm {
        UserForm {
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role.clone(),
        }
    }

    fn body(form: &UserForm, id: Option<EntityId>) -> Result<Value, ValidationError> {
        let mut body = json!({
            "name": required(&form.name, "Name")?,
            "email": required(&form.email, "Email")?,
            "role": required(&form.role, "Role")?,
        });
        if let Some(id) = id {
            body["id"] = json!(id);
        }
        Ok(body)
    }
}
