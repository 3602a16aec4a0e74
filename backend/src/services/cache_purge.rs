//! Console-triggered cache purge: local Redis cache first, then every
//! configured CDN concurrently.

use async_trait::async_trait;
use bb8_redis::redis;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

use crate::{
    db::redis::RedisPool,
    services::{analytics::AnalyticsService, cdn::CdnPurger},
};

/// Redis key prefixes written by the quote and lead caches. The analytics
/// summary is cached in process and cleared separately.
pub const CACHE_PREFIXES: &[&str] = &["quote:", "leads:"];
const PAGE_KEY_PREFIX: &str = "page:";
const SCAN_BATCH: usize = 200;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn delete_by_prefix(&self, prefix: &str) -> anyhow::Result<u64>;

    async fn delete_key(&self, key: &str) -> anyhow::Result<bool>;
}

pub struct RedisCacheStore {
    pool: RedisPool,
}

impl RedisCacheStore {
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn delete_by_prefix(&self, prefix: &str) -> anyhow::Result<u64> {
        let mut conn = self.pool.get().await?;
        let pattern = format!("{}*", prefix);
        let mut cursor: u64 = 0;
        let mut deleted: u64 = 0;
        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut *conn)
                .await?;
            if !keys.is_empty() {
                let removed: u64 = redis::cmd("DEL")
                    .arg(&keys)
                    .query_async(&mut *conn)
                    .await?;
                deleted += removed;
            }
            if next == 0 {
                break;
            }
            cursor = next;
        }
        Ok(deleted)
    }

    async fn delete_key(&self, key: &str) -> anyhow::Result<bool> {
        let mut conn = self.pool.get().await?;
        let removed: u64 = redis::cmd("DEL").arg(key).query_async(&mut *conn).await?;
        Ok(removed > 0)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CdnPurgeResult {
    pub provider: String,
    pub ok: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PurgeReport {
    pub deleted_keys: u64,
    pub revalidated: Vec<String>,
    pub analytics_cache_cleared: bool,
    pub cdn: Vec<CdnPurgeResult>,
}

pub struct CachePurgeService {
    cache: Option<Arc<dyn CacheStore>>,
    analytics: Option<Arc<AnalyticsService>>,
    cdns: Vec<Arc<dyn CdnPurger>>,
    revalidate_paths: Vec<String>,
    cdn_timeout: Duration,
}

impl CachePurgeService {
    pub fn new(
        cache: Option<Arc<dyn CacheStore>>,
        cdns: Vec<Arc<dyn CdnPurger>>,
        revalidate_paths: Vec<String>,
        cdn_timeout: Duration,
    ) -> Self {
        Self {
            cache,
            analytics: None,
            cdns,
            revalidate_paths,
            cdn_timeout,
        }
    }

    pub fn with_analytics(mut self, analytics: Option<Arc<AnalyticsService>>) -> Self {
        self.analytics = analytics;
        self
    }

    /// Fails only if the local cache deletion fails. Revalidation and CDN
    /// failures are logged and reported per item.
    pub async fn purge(&self) -> anyhow::Result<PurgeReport> {
        let mut deleted_keys = 0;
        let mut revalidated = Vec::new();

        if let Some(cache) = &self.cache {
            for prefix in CACHE_PREFIXES {
                deleted_keys += cache.delete_by_prefix(prefix).await?;
            }

            for path in &self.revalidate_paths {
                let key = format!("{}{}", PAGE_KEY_PREFIX, path);
                match cache.delete_key(&key).await {
                    Ok(_) => revalidated.push(path.clone()),
                    Err(err) => tracing::warn!(error = ?err, path = %path, "Failed to revalidate path"),
                }
            }
        } else {
            tracing::debug!("No cache store configured; skipping local purge");
        }

        let analytics_cache_cleared = self
            .analytics
            .as_ref()
            .is_some_and(|analytics| analytics.invalidate());

        let cdn = self.purge_cdns().await;
        tracing::info!(
            deleted_keys,
            revalidated = revalidated.len(),
            analytics_cache_cleared,
            cdn_ok = cdn.iter().filter(|r| r.ok).count(),
            cdn_total = cdn.len(),
            "Cache purge completed"
        );

        Ok(PurgeReport {
            deleted_keys,
            revalidated,
            analytics_cache_cleared,
            cdn,
        })
    }

    async fn purge_cdns(&self) -> Vec<CdnPurgeResult> {
        let mut tasks = JoinSet::new();
        for (index, purger) in self.cdns.iter().enumerate() {
            let purger = Arc::clone(purger);
            let timeout = self.cdn_timeout;
            tasks.spawn(async move {
                let provider = purger.provider_id();
                let ok = match tokio::time::timeout(timeout, purger.purge_all()).await {
                    Ok(Ok(())) => {
                        tracing::info!(provider, "CDN purge succeeded");
                        true
                    }
                    Ok(Err(err)) => {
                        tracing::warn!(provider, error = ?err, "CDN purge failed");
                        false
                    }
                    Err(_) => {
                        tracing::warn!(provider, timeout_ms = timeout.as_millis() as u64, "CDN purge timed out");
                        false
                    }
                };
                (
                    index,
                    CdnPurgeResult {
                        provider: provider.to_string(),
                        ok,
                    },
                )
            });
        }

        let mut results: Vec<(usize, CdnPurgeResult)> = Vec::with_capacity(self.cdns.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(err) => tracing::error!(error = ?err, "CDN purge task panicked"),
            }
        }
        results.sort_by_key(|(index, _)| *index);
        results.into_iter().map(|(_, result)| result).collect()
    }
}
