use async_trait::async_trait;
use sqlx::PgPool;

use crate::models::quote::QuoteRecord;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuoteRepository: Send + Sync {
    async fn insert(&self, quote: &QuoteRecord) -> anyhow::Result<()>;

    /// Newest first.
    async fn list(&self, limit: i64, offset: i64) -> anyhow::Result<Vec<QuoteRecord>>;

    async fn count(&self) -> anyhow::Result<i64>;
}

#[derive(Debug, Clone)]
pub struct PgQuoteRepository {
    pool: PgPool,
}

impl PgQuoteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const QUOTE_COLUMNS: &str = "id, name, email, phone, company, company_size, industry, budget, \
     services, challenge, timeline, privacy_consent, consent_at, client_ip, user_agent, created_at";

#[async_trait]
impl QuoteRepository for PgQuoteRepository {
    async fn insert(&self, quote: &QuoteRecord) -> anyhow::Result<()> {
        // The table's CHECK constraint repeats the consent rule.
        let sql = format!(
            "INSERT INTO quote_requests ({}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)",
            QUOTE_COLUMNS
        );
        sqlx::query(&sql)
        .bind(&quote.id)
        .bind(&quote.name)
        .bind(&quote.email)
        .bind(&quote.phone)
        .bind(&quote.company)
        .bind(&quote.company_size)
        .bind(&quote.industry)
        .bind(&quote.budget)
        .bind(&quote.services)
        .bind(&quote.challenge)
        .bind(&quote.timeline)
        .bind(quote.privacy_consent)
        .bind(quote.consent_at)
        .bind(&quote.client_ip)
        .bind(&quote.user_agent)
        .bind(quote.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list(&self, limit: i64, offset: i64) -> anyhow::Result<Vec<QuoteRecord>> {
        let sql = format!(
            "SELECT {} FROM quote_requests ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2",
            QUOTE_COLUMNS
        );
        let rows = sqlx::query_as::<_, QuoteRecord>(&sql)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn count(&self) -> anyhow::Result<i64> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM quote_requests")
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }
}
