use async_trait::async_trait;

use super::repo_types::{Ticket, TicketMessage, TicketStatus, TicketSummary};
use crate::db::PgStore;

#[async_trait]
pub trait TicketRepo: Send + Sync {
    async fn create(&self, user_id: i64, title: &str, description: &str) -> anyhow::Result<Ticket>;
    /// Newest first.
    async fn list_by_user(&self, user_id: i64) -> anyhow::Result<Vec<Ticket>>;
    /// Newest first.
    async fn list_all(&self) -> anyhow::Result<Vec<TicketSummary>>;
    async fn find(&self, id: i64) -> anyhow::Result<Option<Ticket>>;
    /// Oldest first.
    async fn messages(&self, ticket_id: i64) -> anyhow::Result<Vec<TicketMessage>>;
    /// Appends a message and sets the status atomically. False if the ticket
    /// does not exist.
    async fn reply(
        &self,
        ticket_id: i64,
        sender_id: i64,
        message: &str,
        status: TicketStatus,
    ) -> anyhow::Result<bool>;
    /// Deletes the ticket and its messages.
    async fn delete(&self, id: i64) -> anyhow::Result<bool>;
}

#[async_trait]
impl TicketRepo for PgStore {
    async fn create(&self, user_id: i64, title: &str, description: &str) -> anyhow::Result<Ticket> {
        let ticket = sqlx::query_as::<_, Ticket>(
            r#"
            INSERT INTO support_tickets (user_id, title, description)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, title, description, status, created_at
            "#,
        )
        .bind(user_id)
        .bind(title)
        .bind(description)
        .fetch_one(&self.pool)
        .await?;
        Ok(ticket)
    }

    async fn list_by_user(&self, user_id: i64) -> anyhow::Result<Vec<Ticket>> {
        let rows = sqlx::query_as::<_, Ticket>(
            r#"
            SELECT id, user_id, title, description, status, created_at
              FROM support_tickets
             WHERE user_id = $1
             ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn list_all(&self) -> anyhow::Result<Vec<TicketSummary>> {
        let rows = sqlx::query_as::<_, TicketSummary>(
            r#"
            SELECT t.id, u.username, t.title, t.status, t.created_at
              FROM support_tickets t
              JOIN users u ON u.id = t.user_id
             ORDER BY t.created_at DESC, t.id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn find(&self, id: i64) -> anyhow::Result<Option<Ticket>> {
        let ticket = sqlx::query_as::<_, Ticket>(
            r#"
            SELECT id, user_id, title, description, status, created_at
              FROM support_tickets
             WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(ticket)
    }

    async fn messages(&self, ticket_id: i64) -> anyhow::Result<Vec<TicketMessage>> {
        let rows = sqlx::query_as::<_, TicketMessage>(
            r#"
            SELECT u.username AS sender_username, m.message, m.created_at
              FROM support_ticket_messages m
              JOIN users u ON u.id = m.sender_id
             WHERE m.ticket_id = $1
             ORDER BY m.created_at ASC, m.id ASC
            "#,
        )
        .bind(ticket_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn reply(
        &self,
        ticket_id: i64,
        sender_id: i64,
        message: &str,
        status: TicketStatus,
    ) -> anyhow::Result<bool> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query("UPDATE support_tickets SET status = $2 WHERE id = $1")
            .bind(ticket_id)
            .bind(status.as_str())
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if updated == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(
            r#"
            INSERT INTO support_ticket_messages (ticket_id, sender_id, message)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(ticket_id)
        .bind(sender_id)
        .bind(message)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn delete(&self, id: i64) -> anyhow::Result<bool> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM support_ticket_messages WHERE ticket_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let deleted = sqlx::query("DELETE FROM support_tickets WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;
        Ok(deleted > 0)
    }
}
