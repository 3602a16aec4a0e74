//! Console login, session checks and logout.
//!
//! Two schemes can authenticate an operator:
//! - `DbSession`: the presented token matches an active row in
//!   `console_tokens`, or the shared env token matched while a session store
//!   is available. A random session secret is issued in `console_session`.
//! - `EnvToken`: single-operator mode. The shared `CONSOLE_ACCESS_TOKEN` is
//!   echoed back in the legacy `console_auth` cookie. Only honoured while
//!   [`Config::legacy_cookie_allowed`](crate::config::Config::legacy_cookie_allowed).

use axum::http::HeaderMap;
use std::sync::Arc;

use crate::{
    error::AppError,
    repositories::CredentialStore,
    services::{
        rate_limiter::{RateLimitPolicy, RateLimiter},
        session::{IssuedSession, SessionManager},
    },
    utils::{
        constant_time_eq,
        cookies::{cookie_from_headers, LEGACY_COOKIE_NAME, SESSION_COOKIE_NAME},
        is_valid_console_token, SecretHasher,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    DbSession,
    EnvToken,
}

#[derive(Debug)]
pub enum LoginOutcome {
    Session(IssuedSession),
    /// The shared token itself, to be stored in the legacy cookie.
    LegacyCookie(String),
}

#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    #[error("invalid console token")]
    InvalidToken,
    #[error("too many login attempts")]
    RateLimited,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<LoginError> for AppError {
    fn from(err: LoginError) -> Self {
        match err {
            LoginError::InvalidToken => AppError::Unauthorized("Invalid token".into()),
            LoginError::RateLimited => AppError::TooManyRequests,
            LoginError::Internal(err) => AppError::InternalServerError(err),
        }
    }
}

#[derive(Debug)]
struct Authenticated {
    scheme: AuthScheme,
    credential_id: Option<String>,
}

#[derive(Clone)]
pub struct ConsoleAuthService {
    sessions: Option<SessionManager>,
    credentials: Option<Arc<dyn CredentialStore>>,
    rate_limiter: RateLimiter,
    hasher: SecretHasher,
    shared_token: Option<String>,
    legacy_cookie_allowed: bool,
    login_policy: RateLimitPolicy,
}

impl ConsoleAuthService {
    pub fn new(
        sessions: Option<SessionManager>,
        credentials: Option<Arc<dyn CredentialStore>>,
        rate_limiter: RateLimiter,
        hasher: SecretHasher,
        login_policy: RateLimitPolicy,
    ) -> Self {
        Self {
            sessions,
            credentials,
            rate_limiter,
            hasher,
            shared_token: None,
            legacy_cookie_allowed: false,
            login_policy,
        }
    }

    pub fn with_shared_token(mut self, token: Option<String>) -> Self {
        self.shared_token = token.filter(|t| !t.is_empty());
        self
    }

    pub fn with_legacy_cookie(mut self, allowed: bool) -> Self {
        self.legacy_cookie_allowed = allowed;
        self
    }

    pub fn session_ttl(&self) -> Option<chrono::Duration> {
        self.sessions.as_ref().map(SessionManager::ttl)
    }

    pub async fn login(
        &self,
        token: &str,
        client_ip: &str,
        user_agent: Option<&str>,
    ) -> Result<LoginOutcome, LoginError> {
        // Malformed tokens are rejected before any limiter or store work.
        if !is_valid_console_token(token) {
            tracing::warn!(client_ip, "Console login rejected: malformed token");
            return Err(LoginError::InvalidToken);
        }

        let key = format!("login:{}", client_ip);
        if !self.rate_limiter.allow(&key, self.login_policy).await {
            tracing::warn!(client_ip, "Console login rate limited");
            return Err(LoginError::RateLimited);
        }

        let Some(authenticated) = self.authenticate(token).await else {
            tracing::warn!(client_ip, "Console login rejected: unknown token");
            return Err(LoginError::InvalidToken);
        };

        let outcome = self
            .issue(&authenticated, token, client_ip, user_agent)
            .await?;
        tracing::info!(
            client_ip,
            scheme = ?authenticated.scheme,
            legacy = matches!(outcome, LoginOutcome::LegacyCookie(_)),
            "Console login succeeded"
        );
        Ok(outcome)
    }

    pub async fn is_authenticated(&self, headers: &HeaderMap) -> bool {
        if let (Some(sessions), Some(secret)) = (
            self.sessions.as_ref(),
            cookie_from_headers(headers, SESSION_COOKIE_NAME),
        ) {
            if sessions.verify_session(&secret).await {
                return true;
            }
        }

        if !self.legacy_cookie_allowed {
            return false;
        }
        match (
            self.shared_token.as_deref(),
            cookie_from_headers(headers, LEGACY_COOKIE_NAME),
        ) {
            (Some(shared), Some(presented)) => constant_time_eq(shared, &presented),
            _ => false,
        }
    }

    /// Destroys the session named by the request cookie, if any.
    pub async fn logout(&self, headers: &HeaderMap) {
        if let (Some(sessions), Some(secret)) = (
            self.sessions.as_ref(),
            cookie_from_headers(headers, SESSION_COOKIE_NAME),
        ) {
            sessions.destroy_session(&secret).await;
        }
    }

    async fn authenticate(&self, token: &str) -> Option<Authenticated> {
        if let Some(shared) = self.shared_token.as_deref() {
            if constant_time_eq(shared, token) {
                return Some(Authenticated {
                    scheme: AuthScheme::EnvToken,
                    credential_id: None,
                });
            }
        }

        let store = self.credentials.as_ref()?;
        let credentials = match store.list_active().await {
            Ok(rows) => rows,
            Err(err) => {
                tracing::warn!(error = ?err, "Failed to load console credentials");
                return None;
            }
        };
        if credentials.is_empty() {
            return None;
        }

        let hasher = self.hasher;
        let presented = token.to_string();
        let matched = tokio::task::spawn_blocking(move || {
            credentials
                .into_iter()
                .find(|row| hasher.verify(&presented, &row.token_hash))
        })
        .await;

        match matched {
            Ok(Some(row)) => Some(Authenticated {
                scheme: AuthScheme::DbSession,
                credential_id: Some(row.id),
            }),
            Ok(None) => None,
            Err(err) => {
                tracing::error!(error = ?err, "Credential verification task failed");
                None
            }
        }
    }

    async fn issue(
        &self,
        authenticated: &Authenticated,
        token: &str,
        client_ip: &str,
        user_agent: Option<&str>,
    ) -> Result<LoginOutcome, LoginError> {
        let Some(sessions) = self.sessions.as_ref() else {
            return self.legacy_fallback(authenticated, token, None);
        };

        match sessions
            .create_session(authenticated.credential_id.as_deref(), client_ip, user_agent)
            .await
        {
            Ok(issued) => Ok(LoginOutcome::Session(issued)),
            Err(err) => self.legacy_fallback(authenticated, token, Some(err)),
        }
    }

    fn legacy_fallback(
        &self,
        authenticated: &Authenticated,
        token: &str,
        cause: Option<anyhow::Error>,
    ) -> Result<LoginOutcome, LoginError> {
        if authenticated.scheme == AuthScheme::EnvToken && self.legacy_cookie_allowed {
            if let Some(err) = cause {
                tracing::warn!(error = ?err, "Session store unavailable; issuing legacy cookie");
            }
            return Ok(LoginOutcome::LegacyCookie(token.to_string()));
        }
        Err(LoginError::Internal(cause.unwrap_or_else(|| {
            anyhow::anyhow!("no session store configured for {:?} login", authenticated.scheme)
        })))
    }
}
