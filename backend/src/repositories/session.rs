use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::models::session::ConsoleSession;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert(&self, session: &ConsoleSession) -> anyhow::Result<()>;

    /// Every session with `expires_at` strictly after `now`.
    async fn list_unexpired(&self, now: DateTime<Utc>) -> anyhow::Result<Vec<ConsoleSession>>;

    async fn delete(&self, id: &str) -> anyhow::Result<bool>;

    async fn delete_expired(&self, now: DateTime<Utc>) -> anyhow::Result<u64>;
}

#[derive(Debug, Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn insert(&self, session: &ConsoleSession) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO console_sessions
                (id, secret_hash, credential_id, client_ip, user_agent, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&session.id)
        .bind(&session.secret_hash)
        .bind(&session.credential_id)
        .bind(&session.client_ip)
        .bind(&session.user_agent)
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_unexpired(&self, now: DateTime<Utc>) -> anyhow::Result<Vec<ConsoleSession>> {
        let rows = sqlx::query_as::<_, ConsoleSession>(
            r#"
            SELECT id, secret_hash, credential_id, client_ip, user_agent, created_at, expires_at
            FROM console_sessions
            WHERE expires_at > $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn delete(&self, id: &str) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM console_sessions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> anyhow::Result<u64> {
        let result = sqlx::query("DELETE FROM console_sessions WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
