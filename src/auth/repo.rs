use async_trait::async_trait;

use crate::auth::repo_types::User;
use crate::db::{PgStore, RepoError};

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<User>>;
    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<User>>;
    /// Fails with [`RepoError::Conflict`] when the username is taken.
    async fn create(
        &self,
        username: &str,
        hashed_password: &str,
        is_admin: bool,
    ) -> Result<User, RepoError>;
    async fn list(&self) -> anyhow::Result<Vec<User>>;
    async fn update(
        &self,
        id: i64,
        username: &str,
        is_admin: bool,
    ) -> Result<Option<User>, RepoError>;
    /// Removes the user together with their todos, tickets (and every message
    /// on them), the messages they sent and their sessions.
    async fn delete_cascade(&self, id: i64) -> anyhow::Result<bool>;
}

#[async_trait]
impl UserRepo for PgStore {
    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, hashed_password, is_admin
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, hashed_password, is_admin
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn create(
        &self,
        username: &str,
        hashed_password: &str,
        is_admin: bool,
    ) -> Result<User, RepoError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, hashed_password, is_admin)
            VALUES ($1, $2, $3)
            RETURNING id, username, hashed_password, is_admin
            "#,
        )
        .bind(username)
        .bind(hashed_password)
        .bind(is_admin)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    async fn list(&self) -> anyhow::Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"SELECT id, username, hashed_password, is_admin FROM users ORDER BY id"#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn update(
        &self,
        id: i64,
        username: &str,
        is_admin: bool,
    ) -> Result<Option<User>, RepoError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
               SET username = $2, is_admin = $3
             WHERE id = $1
            RETURNING id, username, hashed_password, is_admin
            "#,
        )
        .bind(id)
        .bind(username)
        .bind(is_admin)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn delete_cascade(&self, id: i64) -> anyhow::Result<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            DELETE FROM support_ticket_messages
             WHERE sender_id = $1
                OR ticket_id IN (SELECT id FROM support_tickets WHERE user_id = $1)
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM support_tickets WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM todos WHERE owner_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM sessions WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let deleted = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;
        Ok(deleted > 0)
    }
}
