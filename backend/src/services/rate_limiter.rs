use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

use bb8_redis::redis;

use crate::db::redis::RedisPool;

const DEFAULT_CLEANUP_THRESHOLD: usize = 10_000;
const REDIS_KEY_PREFIX: &str = "rate_limit:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub max_attempts: u32,
    pub window: Duration,
}

impl RateLimitPolicy {
    pub fn new(max_attempts: u32, window_seconds: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            window: Duration::from_secs(window_seconds.max(1)),
        }
    }
}

/// A fixed-window counter keyed by an opaque string such as `login:{ip}`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RateLimitBackend: Send + Sync {
    /// Records one attempt and reports whether it is within the policy.
    async fn allow(&self, key: &str, policy: RateLimitPolicy) -> bool;
}

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    reset_at: Instant,
}

/// Process-local limiter. Counts do not survive restarts and are not shared
/// between instances.
#[derive(Debug)]
pub struct InMemoryRateLimiter {
    windows: Mutex<HashMap<String, Window>>,
    cleanup_threshold: usize,
}

impl Default for InMemoryRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRateLimiter {
    pub fn new() -> Self {
        Self::with_cleanup_threshold(DEFAULT_CLEANUP_THRESHOLD)
    }

    pub fn with_cleanup_threshold(threshold: usize) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            cleanup_threshold: threshold.max(1),
        }
    }

    pub fn allow_at(&self, key: &str, policy: RateLimitPolicy, now: Instant) -> bool {
        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());
        if windows.len() > self.cleanup_threshold {
            windows.retain(|_, window| now <= window.reset_at);
        }

        let window = windows.entry(key.to_string()).or_insert(Window {
            count: 0,
            reset_at: now + policy.window,
        });
        if now > window.reset_at {
            window.count = 0;
            window.reset_at = now + policy.window;
        }
        window.count = window.count.saturating_add(1);
        window.count <= policy.max_attempts
    }

    pub fn attempts(&self, key: &str) -> Option<u32> {
        self.windows
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .map(|window| window.count)
    }

    pub fn len(&self) -> usize {
        self.windows.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every window whose reset time has passed. Returns how many were
    /// removed.
    pub fn sweep_at(&self, now: Instant) -> usize {
        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());
        let before = windows.len();
        windows.retain(|_, window| now <= window.reset_at);
        before - windows.len()
    }

    /// Sweeps periodically until the limiter is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let limiter = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(limiter) = limiter.upgrade() else {
                    break;
                };
                let removed = limiter.sweep_at(Instant::now());
                if removed > 0 {
                    tracing::debug!(removed, remaining = limiter.len(), "Swept rate limit windows");
                }
            }
        })
    }
}

#[async_trait]
impl RateLimitBackend for InMemoryRateLimiter {
    async fn allow(&self, key: &str, policy: RateLimitPolicy) -> bool {
        self.allow_at(key, policy, Instant::now())
    }
}

/// Increments the counter and arms its expiry in one atomic step. A key left
/// without a TTL (`PTTL` = -1) is re-armed instead of counting forever.
const INCREMENT_SCRIPT: &str = r"
local count = redis.call('INCR', KEYS[1])
if count == 1 or redis.call('PTTL', KEYS[1]) == -1 then
  redis.call('PEXPIRE', KEYS[1], ARGV[1])
end
return count
";

/// Shared counter in Redis, incremented by [`INCREMENT_SCRIPT`].
#[derive(Clone)]
pub struct RedisRateLimiter {
    pool: RedisPool,
    timeout: Duration,
    fail_closed: bool,
}

impl RedisRateLimiter {
    pub fn new(pool: RedisPool, timeout: Duration, fail_closed: bool) -> Self {
        Self {
            pool,
            timeout,
            fail_closed,
        }
    }

    pub fn redis_key(key: &str) -> String {
        format!("{}{}", REDIS_KEY_PREFIX, key)
    }

    async fn increment(&self, key: &str, window: Duration) -> anyhow::Result<i64> {
        let mut conn = self.pool.get().await?;
        let count: i64 = redis::cmd("EVAL")
            .arg(INCREMENT_SCRIPT)
            .arg(1)
            .arg(Self::redis_key(key))
            .arg(window.as_millis() as u64)
            .query_async(&mut *conn)
            .await?;
        Ok(count)
    }

    fn on_failure(&self) -> bool {
        !self.fail_closed
    }
}

#[async_trait]
impl RateLimitBackend for RedisRateLimiter {
    async fn allow(&self, key: &str, policy: RateLimitPolicy) -> bool {
        match tokio::time::timeout(self.timeout, self.increment(key, policy.window)).await {
            Ok(Ok(count)) => count <= i64::from(policy.max_attempts),
            Ok(Err(err)) => {
                tracing::warn!(
                    error = ?err,
                    key,
                    fail_closed = self.fail_closed,
                    "Distributed rate limiter unavailable"
                );
                self.on_failure()
            }
            Err(_) => {
                tracing::warn!(
                    key,
                    timeout_ms = self.timeout.as_millis() as u64,
                    fail_closed = self.fail_closed,
                    "Distributed rate limiter timed out"
                );
                self.on_failure()
            }
        }
    }
}

/// Runs the local limiter and, when configured, the distributed one. An
/// attempt is allowed only if every backend allows it.
#[derive(Clone)]
pub struct RateLimiter {
    local: Arc<dyn RateLimitBackend>,
    distributed: Option<Arc<dyn RateLimitBackend>>,
}

impl RateLimiter {
    pub fn new(
        local: Arc<dyn RateLimitBackend>,
        distributed: Option<Arc<dyn RateLimitBackend>>,
    ) -> Self {
        Self { local, distributed }
    }

    pub fn local_only(local: Arc<dyn RateLimitBackend>) -> Self {
        Self::new(local, None)
    }

    pub async fn allow(&self, key: &str, policy: RateLimitPolicy) -> bool {
        let local = self.local.allow(key, policy).await;
        let distributed = match &self.distributed {
            Some(backend) => backend.allow(key, policy).await,
            None => true,
        };
        if !(local && distributed) {
            tracing::warn!(key, local, distributed, "Rate limit exceeded");
        }
        local && distributed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;

    fn policy() -> RateLimitPolicy {
        RateLimitPolicy::new(5, 60)
    }

    #[test]
    fn allows_up_to_max_then_denies() {
        let limiter = InMemoryRateLimiter::new();
        let now = Instant::now();
        for attempt in 1..=5 {
            assert!(limiter.allow_at("login:1.2.3.4", policy(), now), "attempt {}", attempt);
        }
        assert!(!limiter.allow_at("login:1.2.3.4", policy(), now));
        assert!(!limiter.allow_at("login:1.2.3.4", policy(), now));
    }

    #[test]
    fn counter_restarts_after_window_elapses() {
        let limiter = InMemoryRateLimiter::new();
        let start = Instant::now();
        for _ in 0..6 {
            limiter.allow_at("k", policy(), start);
        }
        assert!(!limiter.allow_at("k", policy(), start + Duration::from_secs(59)));

        let later = start + Duration::from_secs(61);
        assert!(limiter.allow_at("k", policy(), later));
        assert_eq!(limiter.attempts("k"), Some(1));
    }

    #[test]
    fn keys_are_independent() {
        let limiter = InMemoryRateLimiter::new();
        let now = Instant::now();
        for _ in 0..6 {
            limiter.allow_at("login:a", policy(), now);
        }
        assert!(!limiter.allow_at("login:a", policy(), now));
        assert!(limiter.allow_at("login:b", policy(), now));
        assert!(limiter.allow_at("quote:a", policy(), now));
    }

    #[test]
    fn sweep_removes_only_expired_windows() {
        let limiter = InMemoryRateLimiter::new();
        let start = Instant::now();
        limiter.allow_at("old", RateLimitPolicy::new(5, 1), start);
        limiter.allow_at("fresh", RateLimitPolicy::new(5, 600), start);

        let removed = limiter.sweep_at(start + Duration::from_secs(5));
        assert_eq!(removed, 1);
        assert_eq!(limiter.attempts("old"), None);
        assert_eq!(limiter.attempts("fresh"), Some(1));
    }

    #[test]
    fn oversized_map_is_swept_on_insert() {
        let limiter = InMemoryRateLimiter::with_cleanup_threshold(2);
        let start = Instant::now();
        let short = RateLimitPolicy::new(5, 1);
        for key in ["a", "b", "c"] {
            limiter.allow_at(key, short, start);
        }
        assert_eq!(limiter.len(), 3);

        limiter.allow_at("d", short, start + Duration::from_secs(10));
        assert_eq!(limiter.len(), 1);
        assert_eq!(limiter.attempts("d"), Some(1));
    }

    #[tokio::test]
    async fn sweeper_stops_when_limiter_is_dropped() {
        let limiter = Arc::new(InMemoryRateLimiter::new());
        let handle = limiter.spawn_sweeper(Duration::from_millis(5));
        drop(limiter);
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("sweeper should exit")
            .expect("sweeper task should not panic");
    }

    #[tokio::test]
    async fn composite_denies_when_distributed_backend_denies() {
        let mut distributed = MockRateLimitBackend::new();
        distributed
            .expect_allow()
            .with(eq("login:1.2.3.4"), eq(policy()))
            .times(1)
            .returning(|_, _| false);
        let limiter = RateLimiter::new(
            Arc::new(InMemoryRateLimiter::new()),
            Some(Arc::new(distributed)),
        );
        assert!(!limiter.allow("login:1.2.3.4", policy()).await);
    }

    #[tokio::test]
    async fn composite_still_enforces_local_limit_when_distributed_allows() {
        let mut distributed = MockRateLimitBackend::new();
        distributed.expect_allow().returning(|_, _| true);
        let limiter = RateLimiter::new(
            Arc::new(InMemoryRateLimiter::new()),
            Some(Arc::new(distributed)),
        );
        for _ in 0..5 {
            assert!(limiter.allow("k", policy()).await);
        }
        assert!(!limiter.allow("k", policy()).await);
    }

    #[test]
    fn policy_never_allows_zero_attempts_or_window() {
        let policy = RateLimitPolicy::new(0, 0);
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.window, Duration::from_secs(1));
    }
}
