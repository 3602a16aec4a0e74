//! Server-side console sessions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
/// Database representation of a console session.
pub struct ConsoleSession {
    /// Unique identifier for the session record.
    pub id: String,
    /// Argon2 hash of the secret held in the client's cookie.
    #[serde(skip_serializing)]
    pub secret_hash: String,
    /// Credential that authorized the login; `None` for the shared-token path.
    pub credential_id: Option<String>,
    pub client_ip: String,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    /// The session is valid strictly before this instant.
    pub expires_at: DateTime<Utc>,
}

impl ConsoleSession {
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}
