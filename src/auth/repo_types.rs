use serde::Serialize;
use sqlx::FromRow;

use crate::authz::Identity;

/// User record in the database.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub hashed_password: String, // argon2 PHC string, never rendered
    pub is_admin: bool,
}

impl User {
    pub fn identity(&self) -> Identity {
        Identity {
            id: self.id,
            is_admin: self.is_admin,
        }
    }
}
