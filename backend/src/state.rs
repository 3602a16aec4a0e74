use std::sync::Arc;
use std::time::Duration;

use crate::{
    config::Config,
    db::{connection::DbPool, redis::RedisPool},
    middleware::gate::GateConfig,
    repositories::{
        CredentialStore, PgCredentialStore, PgQuoteRepository, PgSessionStore, QuoteRepository,
    },
    services::{
        analytics::AnalyticsService,
        cache_purge::{CachePurgeService, CacheStore, RedisCacheStore},
        cdn::configured_purgers,
        console_auth::ConsoleAuthService,
        rate_limiter::{
            InMemoryRateLimiter, RateLimitBackend, RateLimitPolicy, RateLimiter, RedisRateLimiter,
        },
        session::SessionManager,
    },
    utils::{cookies::CookieOptions, SecretHasher},
};

const RATE_LIMIT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub auth: ConsoleAuthService,
    pub rate_limiter: RateLimiter,
    pub quotes: Option<Arc<dyn QuoteRepository>>,
    pub cache_purge: Arc<CachePurgeService>,
    pub analytics: Option<Arc<AnalyticsService>>,
    pub gate: Arc<GateConfig>,
}

impl AppState {
    /// Wires every service from configuration. Postgres and Redis are both
    /// optional; the features that need them degrade as documented on each
    /// service.
    pub async fn from_config(
        config: Config,
        db_pool: Option<DbPool>,
        redis_pool: Option<RedisPool>,
    ) -> anyhow::Result<Self> {
        let local = Arc::new(InMemoryRateLimiter::new());
        local.spawn_sweeper(RATE_LIMIT_SWEEP_INTERVAL);
        let distributed = redis_pool.clone().map(|pool| {
            Arc::new(RedisRateLimiter::new(
                pool,
                Duration::from_secs(config.redis_connect_timeout.max(1)),
                config.rate_limit_distributed_fail_closed,
            )) as Arc<dyn RateLimitBackend>
        });
        let rate_limiter = RateLimiter::new(local, distributed);

        let hasher = SecretHasher::new(config.session_hash_cost);
        let sessions = db_pool.clone().map(|pool| {
            SessionManager::new(
                Arc::new(PgSessionStore::new(pool)),
                hasher,
                chrono::Duration::hours(config.session_ttl_hours),
            )
        });
        let credentials = db_pool
            .clone()
            .map(|pool| Arc::new(PgCredentialStore::new(pool)) as Arc<dyn CredentialStore>);
        let auth = ConsoleAuthService::new(
            sessions,
            credentials,
            rate_limiter.clone(),
            hasher,
            login_policy(&config),
        )
        .with_shared_token(config.console_access_token.clone())
        .with_legacy_cookie(config.legacy_cookie_allowed());

        let quotes = db_pool
            .map(|pool| Arc::new(PgQuoteRepository::new(pool)) as Arc<dyn QuoteRepository>);

        let cache = redis_pool
            .map(|pool| Arc::new(RedisCacheStore::new(pool)) as Arc<dyn CacheStore>);
        let analytics = AnalyticsService::from_config(&config)?.map(Arc::new);
        let cache_purge = CachePurgeService::new(
            cache,
            configured_purgers(&config).await?,
            config.revalidate_paths.clone(),
            Duration::from_secs(config.cdn_purge_timeout_seconds.max(1)),
        )
        .with_analytics(analytics.clone());

        Ok(Self {
            gate: Arc::new(GateConfig::from_config(&config)),
            config: Arc::new(config),
            auth,
            rate_limiter,
            quotes,
            cache_purge: Arc::new(cache_purge),
            analytics,
        })
    }

    pub fn quote_policy(&self) -> RateLimitPolicy {
        RateLimitPolicy::new(
            self.config.rate_limit_quote_max,
            self.config.rate_limit_quote_window_seconds,
        )
    }

    pub fn cookie_options(&self) -> CookieOptions {
        CookieOptions::console(self.config.production_mode)
    }
}

pub fn login_policy(config: &Config) -> RateLimitPolicy {
    RateLimitPolicy::new(
        config.rate_limit_login_max,
        config.rate_limit_login_window_seconds,
    )
}
