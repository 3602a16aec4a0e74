pub mod analytics;
pub mod cache_purge;
pub mod cdn;
pub mod console_auth;
pub mod rate_limiter;
pub mod session;
