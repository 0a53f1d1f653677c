use async_trait::async_trait;
use sqlx::FromRow;
use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

use crate::db::PgStore;

/// Server-side half of a session. The cookie only carries the id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionData {
    pub user_id: Option<i64>,
    pub csrf_token: Option<String>,
}

impl SessionData {
    pub fn is_empty(&self) -> bool {
        self.user_id.is_none() && self.csrf_token.is_none()
    }
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Returns the data for a live (unexpired) session.
    async fn load(&self, id: Uuid) -> anyhow::Result<Option<SessionData>>;
    /// Upserts the session. A session naming a user that no longer exists is
    /// dropped instead of written.
    async fn save(&self, id: Uuid, data: &SessionData, expires_at: OffsetDateTime)
        -> anyhow::Result<()>;
    async fn delete(&self, id: Uuid) -> anyhow::Result<()>;
    /// Drops expired rows; returns how many went.
    async fn purge_expired(&self) -> anyhow::Result<u64>;
}

#[derive(FromRow)]
struct SessionRow {
    user_id: Option<i64>,
    csrf_token: Option<String>,
}

#[async_trait]
impl SessionStore for PgStore {
    async fn load(&self, id: Uuid) -> anyhow::Result<Option<SessionData>> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT user_id, csrf_token
            FROM sessions
            WHERE id = $1 AND expires_at > now()
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| SessionData {
            user_id: r.user_id,
            csrf_token: r.csrf_token,
        }))
    }

    async fn save(
        &self,
        id: Uuid,
        data: &SessionData,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<()> {
        // The user may have been deleted while this request was in flight;
        // such a session is simply not written back.
        let res = sqlx::query(
            r#"
            INSERT INTO sessions (id, user_id, csrf_token, expires_at)
            SELECT $1, $2, $3, $4
             WHERE $2::BIGINT IS NULL OR EXISTS (SELECT 1 FROM users WHERE id = $2)
            ON CONFLICT (id) DO UPDATE
               SET user_id = EXCLUDED.user_id,
                   csrf_token = EXCLUDED.csrf_token,
                   expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(id)
        .bind(data.user_id)
        .bind(data.csrf_token.as_deref())
        .bind(expires_at)
        .execute(&self.pool)
        .await;

        match res {
            Ok(done) => {
                if done.rows_affected() == 0 {
                    debug!(session_id = %id, user_id = ?data.user_id, "session user gone; not saved");
                }
                Ok(())
            }
            Err(sqlx::Error::Database(db)) if db.is_foreign_key_violation() => {
                debug!(session_id = %id, user_id = ?data.user_id, "session user deleted concurrently; not saved");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn purge_expired(&self) -> anyhow::Result<u64> {
        let res = sqlx::query("DELETE FROM sessions WHERE expires_at <= now()")
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected())
    }
}
