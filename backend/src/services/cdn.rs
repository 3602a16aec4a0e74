//! Edge cache purge providers.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use aws_sdk_cloudfront::types::{InvalidationBatch, Paths};
use reqwest::Client;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;

const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";
const FASTLY_API_BASE: &str = "https://api.fastly.com";
const CLOUDFRONT_PURGE_PATH: &str = "/*";

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CdnPurger: Send + Sync {
    fn provider_id(&self) -> &'static str;

    /// Drops everything the provider has cached for the site.
    async fn purge_all(&self) -> Result<()>;
}

pub struct CloudflarePurger {
    client: Client,
    zone_id: String,
    api_token: String,
}

impl CloudflarePurger {
    pub fn new(client: Client, zone_id: String, api_token: String) -> Self {
        Self {
            client,
            zone_id,
            api_token,
        }
    }
}

#[async_trait]
impl CdnPurger for CloudflarePurger {
    fn provider_id(&self) -> &'static str {
        "cloudflare"
    }

    async fn purge_all(&self) -> Result<()> {
        let url = format!("{}/zones/{}/purge_cache", CLOUDFLARE_API_BASE, self.zone_id);
        self.client
            .post(url)
            .bearer_auth(&self.api_token)
            .json(&json!({ "purge_everything": true }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

pub struct FastlyPurger {
    client: Client,
    service_id: String,
    api_token: String,
}

impl FastlyPurger {
    pub fn new(client: Client, service_id: String, api_token: String) -> Self {
        Self {
            client,
            service_id,
            api_token,
        }
    }
}

#[async_trait]
impl CdnPurger for FastlyPurger {
    fn provider_id(&self) -> &'static str {
        "fastly"
    }

    async fn purge_all(&self) -> Result<()> {
        let url = format!("{}/service/{}/purge_all", FASTLY_API_BASE, self.service_id);
        self.client
            .post(url)
            .header("Fastly-Key", &self.api_token)
            .header("Accept", "application/json")
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

pub struct CloudFrontPurger {
    client: aws_sdk_cloudfront::Client,
    distribution_id: String,
}

impl CloudFrontPurger {
    pub fn new(client: aws_sdk_cloudfront::Client, distribution_id: String) -> Self {
        Self {
            client,
            distribution_id,
        }
    }
}

#[async_trait]
impl CdnPurger for CloudFrontPurger {
    fn provider_id(&self) -> &'static str {
        "cloudfront"
    }

    async fn purge_all(&self) -> Result<()> {
        let paths = Paths::builder()
            .quantity(1)
            .items(CLOUDFRONT_PURGE_PATH)
            .build()
            .map_err(|e| anyhow!("Invalid invalidation paths: {}", e))?;
        let batch = InvalidationBatch::builder()
            .paths(paths)
            .caller_reference(format!("console-purge-{}", uuid::Uuid::new_v4()))
            .build()
            .map_err(|e| anyhow!("Invalid invalidation batch: {}", e))?;

        let output = self
            .client
            .create_invalidation()
            .distribution_id(&self.distribution_id)
            .invalidation_batch(batch)
            .send()
            .await?;
        if let Some(invalidation) = output.invalidation() {
            tracing::debug!(invalidation_id = invalidation.id(), "CloudFront invalidation created");
        }
        Ok(())
    }
}

/// Builds a purger for every provider whose credentials are fully configured.
pub async fn configured_purgers(config: &Config) -> Result<Vec<Arc<dyn CdnPurger>>> {
    let client = Client::builder()
        .timeout(Duration::from_secs(config.cdn_purge_timeout_seconds.max(1)))
        .build()
        .map_err(|e| anyhow!("Failed to initialize HTTP client: {}", e))?;

    let mut purgers: Vec<Arc<dyn CdnPurger>> = Vec::new();
    if let (Some(zone_id), Some(token)) = (&config.cloudflare_zone_id, &config.cloudflare_api_token)
    {
        purgers.push(Arc::new(CloudflarePurger::new(
            client.clone(),
            zone_id.clone(),
            token.clone(),
        )));
    }
    if let (Some(service_id), Some(token)) = (&config.fastly_service_id, &config.fastly_api_token) {
        purgers.push(Arc::new(FastlyPurger::new(
            client.clone(),
            service_id.clone(),
            token.clone(),
        )));
    }
    if let Some(distribution_id) = &config.cloudfront_distribution_id {
        let sdk_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        purgers.push(Arc::new(CloudFrontPurger::new(
            aws_sdk_cloudfront::Client::new(&sdk_config),
            distribution_id.clone(),
        )));
    }

    let providers: Vec<&str> = purgers.iter().map(|p| p.provider_id()).collect();
    tracing::info!(?providers, "CDN purge providers configured");
    Ok(purgers)
}
