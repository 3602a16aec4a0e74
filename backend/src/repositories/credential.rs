//! Credential store for console access tokens.
//!
//! Lookups are never keyed by the presented token: callers load every active
//! row and compare hashes.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::models::credential::ConsoleCredential;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn list_active(&self) -> anyhow::Result<Vec<ConsoleCredential>>;

    async fn insert(&self, credential: &ConsoleCredential) -> anyhow::Result<()>;

    /// Revokes without deleting. Returns whether a row changed.
    async fn deactivate(&self, id: &str) -> anyhow::Result<bool>;
}

#[derive(Debug, Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn list_active(&self) -> anyhow::Result<Vec<ConsoleCredential>> {
        let rows = sqlx::query_as::<_, ConsoleCredential>(
            "SELECT id, token_hash, description, active, created_at \
             FROM console_tokens WHERE active = TRUE ORDER BY created_at ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn insert(&self, credential: &ConsoleCredential) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO console_tokens (id, token_hash, description, active, created_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&credential.id)
        .bind(&credential.token_hash)
        .bind(&credential.description)
        .bind(credential.active)
        .bind(credential.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn deactivate(&self, id: &str) -> anyhow::Result<bool> {
        let result = sqlx::query("UPDATE console_tokens SET active = FALSE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
