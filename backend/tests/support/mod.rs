#![allow(dead_code)]
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header::SET_COOKIE, request::Builder, HeaderMap, Request},
    response::Response,
    Router,
};
use chrono::{DateTime, Utc};
use http_body_util::BodyExt;
use serde_json::Value;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};
use studio_backend::{
    config::Config,
    middleware::gate::GateConfig,
    models::{credential::ConsoleCredential, quote::QuoteRecord, session::ConsoleSession},
    repositories::{CredentialStore, QuoteRepository, SessionStore},
    routes::build_router,
    services::{
        cache_purge::CachePurgeService,
        console_auth::ConsoleAuthService,
        rate_limiter::{InMemoryRateLimiter, RateLimiter},
        session::SessionManager,
    },
    state::{login_policy, AppState},
    utils::SecretHasher,
};

pub const SHARED_TOKEN: &str = "Shared123Tok";
pub const DB_TOKEN: &str = "Db1Token2345";
pub const BROWSER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) Firefox/128.0";
pub const ALLOWED_ORIGIN: &str = "https://studio.dev";

#[derive(Default)]
pub struct MemorySessionStore {
    rows: Mutex<Vec<ConsoleSession>>,
}

impl MemorySessionStore {
    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn rows(&self) -> Vec<ConsoleSession> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn insert(&self, session: &ConsoleSession) -> anyhow::Result<()> {
        self.rows.lock().unwrap().push(session.clone());
        Ok(())
    }

    async fn list_unexpired(&self, now: DateTime<Utc>) -> anyhow::Result<Vec<ConsoleSession>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.expires_at > now)
            .cloned()
            .collect())
    }

    async fn delete(&self, id: &str) -> anyhow::Result<bool> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|s| s.id != id);
        Ok(rows.len() != before)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> anyhow::Result<u64> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|s| s.expires_at > now);
        Ok((before - rows.len()) as u64)
    }
}

#[derive(Default)]
pub struct MemoryCredentialStore {
    rows: Mutex<Vec<ConsoleCredential>>,
}

impl MemoryCredentialStore {
    pub fn with_token(token: &str) -> Self {
        let store = Self::default();
        store.rows.lock().unwrap().push(ConsoleCredential {
            id: "cred-seeded".into(),
            token_hash: SecretHasher::new(8).hash(token).expect("hash token"),
            description: "integration test".into(),
            active: true,
            created_at: Utc::now(),
        });
        store
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn list_active(&self) -> anyhow::Result<Vec<ConsoleCredential>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.active)
            .cloned()
            .collect())
    }

    async fn insert(&self, credential: &ConsoleCredential) -> anyhow::Result<()> {
        self.rows.lock().unwrap().push(credential.clone());
        Ok(())
    }

    async fn deactivate(&self, id: &str) -> anyhow::Result<bool> {
        let mut rows = self.rows.lock().unwrap();
        match rows.iter_mut().find(|c| c.id == id && c.active) {
            Some(row) => {
                row.active = false;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[derive(Default)]
pub struct MemoryQuoteRepository {
    rows: Mutex<Vec<QuoteRecord>>,
}

impl MemoryQuoteRepository {
    pub fn rows(&self) -> Vec<QuoteRecord> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl QuoteRepository for MemoryQuoteRepository {
    async fn insert(&self, quote: &QuoteRecord) -> anyhow::Result<()> {
        self.rows.lock().unwrap().push(quote.clone());
        Ok(())
    }

    async fn list(&self, limit: i64, offset: i64) -> anyhow::Result<Vec<QuoteRecord>> {
        let mut rows = self.rows.lock().unwrap().clone();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn count(&self) -> anyhow::Result<i64> {
        Ok(self.rows.lock().unwrap().len() as i64)
    }
}

pub fn test_config(extra: &[(&str, &str)]) -> Config {
    let mut map: HashMap<String, String> = HashMap::new();
    map.insert("CONSOLE_ACCESS_TOKEN".into(), SHARED_TOKEN.into());
    map.insert("SESSION_HASH_COST".into(), "8".into());
    for (key, value) in extra {
        map.insert(key.to_string(), value.to_string());
    }
    Config::from_lookup(|key| map.get(key).cloned())
}

pub struct TestApp {
    pub router: Router,
    pub sessions: Arc<MemorySessionStore>,
    pub credentials: Arc<MemoryCredentialStore>,
    pub quotes: Arc<MemoryQuoteRepository>,
}

impl TestApp {
    /// Database-backed mode with in-memory stores standing in for Postgres.
    pub fn new() -> Self {
        Self::with_config(test_config(&[]))
    }

    pub fn with_config(config: Config) -> Self {
        let sessions = Arc::new(MemorySessionStore::default());
        let credentials = Arc::new(MemoryCredentialStore::with_token(DB_TOKEN));
        let quotes = Arc::new(MemoryQuoteRepository::default());

        let hasher = SecretHasher::new(config.session_hash_cost);
        let rate_limiter = RateLimiter::local_only(Arc::new(InMemoryRateLimiter::new()));
        let session_manager = SessionManager::new(
            sessions.clone(),
            hasher,
            chrono::Duration::hours(config.session_ttl_hours),
        );
        let auth = ConsoleAuthService::new(
            Some(session_manager),
            Some(credentials.clone()),
            rate_limiter.clone(),
            hasher,
            login_policy(&config),
        )
        .with_shared_token(config.console_access_token.clone())
        .with_legacy_cookie(false);

        let state = AppState {
            gate: Arc::new(GateConfig::from_config(&config)),
            config: Arc::new(config),
            auth,
            rate_limiter,
            quotes: Some(quotes.clone()),
            cache_purge: Arc::new(CachePurgeService::new(
                None,
                Vec::new(),
                vec!["/".into()],
                Duration::from_secs(1),
            )),
            analytics: None,
        };

        Self {
            router: build_router(state),
            sessions,
            credentials,
            quotes,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        use tower::ServiceExt;
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }
}

/// A request that passes the gate: browser agent, forwarded IP and an allowed
/// origin.
pub fn browser_request(method: &str, uri: &str, ip: &str) -> Builder {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("user-agent", BROWSER_AGENT)
        .header("x-forwarded-for", ip)
        .header("origin", ALLOWED_ORIGIN)
}

pub fn json_request(method: &str, uri: &str, ip: &str, body: &Value) -> Request<Body> {
    browser_request(method, uri, ip)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn body_json(response: Response) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("json body")
}

pub fn set_cookies(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::to_owned)
        .collect()
}

/// Value of `name` from the response's `Set-Cookie` headers.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    set_cookies(headers).into_iter().find_map(|cookie| {
        let pair = cookie.split(';').next()?.trim().to_string();
        let (key, value) = pair.split_once('=')?;
        (key == name && !value.is_empty()).then(|| value.to_string())
    })
}
