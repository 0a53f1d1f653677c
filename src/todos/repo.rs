use async_trait::async_trait;

use super::repo_types::{Todo, TodoWithOwner};
use crate::db::PgStore;

#[async_trait]
pub trait TodoRepo: Send + Sync {
    async fn create(&self, owner_id: i64, title: &str, description: &str) -> anyhow::Result<Todo>;
    async fn list_by_owner(&self, owner_id: i64) -> anyhow::Result<Vec<Todo>>;
    async fn list_all(&self) -> anyhow::Result<Vec<TodoWithOwner>>;
    async fn find(&self, id: i64) -> anyhow::Result<Option<Todo>>;
    async fn set_completed(&self, id: i64, completed: bool) -> anyhow::Result<bool>;
    async fn update(
        &self,
        id: i64,
        title: &str,
        description: &str,
        completed: bool,
    ) -> anyhow::Result<Option<Todo>>;
    async fn delete(&self, id: i64) -> anyhow::Result<bool>;
}

#[async_trait]
impl TodoRepo for PgStore {
    async fn create(&self, owner_id: i64, title: &str, description: &str) -> anyhow::Result<Todo> {
        let todo = sqlx::query_as::<_, Todo>(
            r#"
            INSERT INTO todos (title, description, owner_id)
            VALUES ($1, $2, $3)
            RETURNING id, title, description, completed, owner_id
            "#,
        )
        .bind(title)
        .bind(description)
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(todo)
    }

    async fn list_by_owner(&self, owner_id: i64) -> anyhow::Result<Vec<Todo>> {
        let rows = sqlx::query_as::<_, Todo>(
            r#"
            SELECT id, title, description, completed, owner_id
            FROM todos
            WHERE owner_id = $1
            ORDER BY id
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn list_all(&self) -> anyhow::Result<Vec<TodoWithOwner>> {
        let rows = sqlx::query_as::<_, TodoWithOwner>(
            r#"
            SELECT t.id, t.title, t.description, t.completed, t.owner_id,
                   u.username AS owner_username
              FROM todos t
              JOIN users u ON u.id = t.owner_id
             ORDER BY t.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn find(&self, id: i64) -> anyhow::Result<Option<Todo>> {
        let todo = sqlx::query_as::<_, Todo>(
            r#"SELECT id, title, description, completed, owner_id FROM todos WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(todo)
    }

    async fn set_completed(&self, id: i64, completed: bool) -> anyhow::Result<bool> {
        let res = sqlx::query("UPDATE todos SET completed = $2 WHERE id = $1")
            .bind(id)
            .bind(completed)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn update(
        &self,
        id: i64,
        title: &str,
        description: &str,
        completed: bool,
    ) -> anyhow::Result<Option<Todo>> {
        let todo = sqlx::query_as::<_, Todo>(
            r#"
            UPDATE todos
               SET title = $2, description = $3, completed = $4
             WHERE id = $1
            RETURNING id, title, description, completed, owner_id
            "#,
        )
        .bind(id)
        .bind(title)
        .bind(description)
        .bind(completed)
        .fetch_optional(&self.pool)
        .await?;
        Ok(todo)
    }

    async fn delete(&self, id: i64) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM todos WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
