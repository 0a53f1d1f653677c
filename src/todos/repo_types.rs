use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Todo {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub completed: bool,
    pub owner_id: i64,
}

/// Todo joined with its owner's username, for the admin listing.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TodoWithOwner {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub completed: bool,
    pub owner_id: i64,
    pub owner_username: String,
}
