//! Console access tokens. Only the hash of a token is ever stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ConsoleCredential {
    pub id: String,
    #[serde(skip_serializing)]
    pub token_hash: String,
    pub description: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}
