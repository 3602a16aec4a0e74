use serde::{Deserialize, Serialize};
use std::env;

const DEFAULT_ALLOWED_ORIGINS: &[&str] = &[
    "studio.dev",
    "www.studio.dev",
    "labs.studio.dev",
    "localhost:3000",
    "*.vercel.app",
];

const DEFAULT_REVALIDATE_PATHS: &[&str] = &["/", "/services", "/portfolio", "/contact"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub bind_addr: String,
    pub production_mode: bool,
    pub database_url: Option<String>,
    pub redis_url: Option<String>,
    pub redis_pool_size: u32,
    pub redis_connect_timeout: u64,
    pub console_access_token: Option<String>,
    pub session_hash_cost: u32,
    pub session_ttl_hours: i64,
    pub allowed_origins: Vec<String>,
    pub blocked_ips: Vec<String>,
    pub rate_limit_login_max: u32,
    pub rate_limit_login_window_seconds: u64,
    pub rate_limit_quote_max: u32,
    pub rate_limit_quote_window_seconds: u64,
    pub rate_limit_distributed_fail_closed: bool,
    pub cloudflare_zone_id: Option<String>,
    pub cloudflare_api_token: Option<String>,
    pub fastly_service_id: Option<String>,
    pub fastly_api_token: Option<String>,
    pub cloudfront_distribution_id: Option<String>,
    pub cdn_purge_timeout_seconds: u64,
    pub revalidate_paths: Vec<String>,
    pub ga4_property_id: Option<String>,
    pub ga4_access_token: Option<String>,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Ok(Self::from_lookup(|key| env::var(key).ok()))
    }

    /// Builds a config from an arbitrary key lookup so parsing can be
    /// exercised without touching the process environment.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let production_mode = optional("APP_ENV")
            .map(|value| value.eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        Config {
            bind_addr: optional("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            production_mode,
            database_url: optional("DATABASE_URL"),
            redis_url: optional("REDIS_URL"),
            redis_pool_size: parse_or(lookup("REDIS_POOL_SIZE"), 10),
            redis_connect_timeout: parse_or(lookup("REDIS_CONNECT_TIMEOUT"), 5),
            console_access_token: optional("CONSOLE_ACCESS_TOKEN"),
            session_hash_cost: parse_or(lookup("SESSION_HASH_COST"), 12u32).clamp(8, 20),
            session_ttl_hours: parse_or(lookup("SESSION_TTL_HOURS"), 8i64).max(1),
            allowed_origins: parse_csv(lookup("ALLOWED_ORIGINS"), DEFAULT_ALLOWED_ORIGINS),
            blocked_ips: parse_csv(lookup("BLOCKED_IPS"), &[]),
            rate_limit_login_max: parse_or(lookup("RATE_LIMIT_LOGIN_MAX"), 6u32).max(1),
            rate_limit_login_window_seconds: parse_or(
                lookup("RATE_LIMIT_LOGIN_WINDOW_SECONDS"),
                60u64,
            )
            .max(1),
            rate_limit_quote_max: parse_or(lookup("RATE_LIMIT_QUOTE_MAX"), 5u32).max(1),
            rate_limit_quote_window_seconds: parse_or(
                lookup("RATE_LIMIT_QUOTE_WINDOW_SECONDS"),
                60u64,
            )
            .max(1),
            rate_limit_distributed_fail_closed: parse_or(
                lookup("RATE_LIMIT_DISTRIBUTED_FAIL_CLOSED"),
                false,
            ),
            cloudflare_zone_id: optional("CLOUDFLARE_ZONE_ID"),
            cloudflare_api_token: optional("CLOUDFLARE_API_TOKEN"),
            fastly_service_id: optional("FASTLY_SERVICE_ID"),
            fastly_api_token: optional("FASTLY_API_TOKEN"),
            cloudfront_distribution_id: optional("CLOUDFRONT_DISTRIBUTION_ID"),
            cdn_purge_timeout_seconds: parse_or(lookup("CDN_PURGE_TIMEOUT_SECONDS"), 5u64).max(1),
            revalidate_paths: parse_csv(lookup("REVALIDATE_PATHS"), DEFAULT_REVALIDATE_PATHS),
            ga4_property_id: optional("GA4_PROPERTY_ID"),
            ga4_access_token: optional("GA4_ACCESS_TOKEN"),
        }
    }

    /// The plain shared-token cookie is only honoured when no database backs
    /// sessions, or outside production.
    pub fn legacy_cookie_allowed(&self) -> bool {
        self.database_url.is_none() || !self.production_mode
    }

    pub fn analytics_configured(&self) -> bool {
        self.ga4_property_id.is_some() && self.ga4_access_token.is_some()
    }
}

fn parse_or<T: std::str::FromStr>(raw: Option<String>, default: T) -> T {
    raw.and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}

fn parse_csv(raw: Option<String>, default: &[&str]) -> Vec<String> {
    let values: Vec<String> = raw
        .unwrap_or_default()
        .split(',')
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect();
    if values.is_empty() {
        default.iter().map(|value| value.to_string()).collect()
    } else {
        values
    }
}
