//! Console session lifecycle.
//!
//! The plaintext session secret only ever lives in the client's cookie. The
//! store keeps an Argon2 hash, so verification loads every unexpired row and
//! compares hashes until one matches.

use chrono::{DateTime, Duration, Utc};
use std::{fmt, sync::Arc};
use uuid::Uuid;

use crate::{
    models::session::ConsoleSession,
    repositories::SessionStore,
    utils::{generate_session_secret, SecretHasher},
};

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Returned once from [`SessionManager::create_session`]; the secret cannot be
/// recovered afterwards.
pub struct IssuedSession {
    pub secret: String,
    pub expires_at: DateTime<Utc>,
}

impl fmt::Debug for IssuedSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedSession")
            .field("secret", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    hasher: SecretHasher,
    ttl: Duration,
    clock: Clock,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>, hasher: SecretHasher, ttl: Duration) -> Self {
        Self {
            store,
            hasher,
            ttl,
            clock: Arc::new(Utc::now),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn create_session(
        &self,
        credential_id: Option<&str>,
        client_ip: &str,
        user_agent: Option<&str>,
    ) -> anyhow::Result<IssuedSession> {
        let secret = generate_session_secret();
        let hasher = self.hasher;
        let to_hash = secret.clone();
        let secret_hash = tokio::task::spawn_blocking(move || hasher.hash(&to_hash)).await??;

        let now = (self.clock)();
        let session = ConsoleSession {
            id: Uuid::new_v4().to_string(),
            secret_hash,
            credential_id: credential_id.map(str::to_owned),
            client_ip: client_ip.to_string(),
            user_agent: user_agent.map(str::to_owned),
            created_at: now,
            expires_at: now + self.ttl,
        };
        self.store.insert(&session).await?;

        tracing::info!(
            session_id = %session.id,
            credential_id = ?session.credential_id,
            client_ip = %session.client_ip,
            expires_at = %session.expires_at,
            "Console session created"
        );

        Ok(IssuedSession {
            secret,
            expires_at: session.expires_at,
        })
    }

    /// Fails closed: store errors are logged and reported as unauthenticated.
    pub async fn verify_session(&self, presented_secret: &str) -> bool {
        match self.find_matching(presented_secret).await {
            Ok(found) => found.is_some(),
            Err(err) => {
                tracing::warn!(error = ?err, "Session verification failed; treating as unauthenticated");
                false
            }
        }
    }

    /// Idempotent: an unknown or expired secret is a no-op.
    pub async fn destroy_session(&self, presented_secret: &str) {
        let session = match self.find_matching(presented_secret).await {
            Ok(Some(session)) => session,
            Ok(None) => return,
            Err(err) => {
                tracing::warn!(error = ?err, "Session lookup failed during logout");
                return;
            }
        };

        match self.store.delete(&session.id).await {
            Ok(_) => tracing::info!(session_id = %session.id, "Console session destroyed"),
            Err(err) => {
                tracing::warn!(error = ?err, session_id = %session.id, "Failed to delete session")
            }
        }
    }

    pub async fn purge_expired(&self) -> anyhow::Result<u64> {
        self.store.delete_expired((self.clock)()).await
    }

    async fn find_matching(&self, presented_secret: &str) -> anyhow::Result<Option<ConsoleSession>> {
        if presented_secret.is_empty() {
            return Ok(None);
        }
        let now = (self.clock)();
        let candidates: Vec<ConsoleSession> = self
            .store
            .list_unexpired(now)
            .await?
            .into_iter()
            .filter(|session| session.is_live_at(now))
            .collect();
        if candidates.is_empty() {
            return Ok(None);
        }

        let hasher = self.hasher;
        let secret = presented_secret.to_string();
        let matched = tokio::task::spawn_blocking(move || {
            candidates
                .into_iter()
                .find(|session| hasher.verify(&secret, &session.secret_hash))
        })
        .await?;
        Ok(matched)
    }
}
