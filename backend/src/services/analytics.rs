//! Site traffic summary for the console, backed by the GA4 Data API.

use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::config::Config;

const GA4_API_BASE: &str = "https://analyticsdata.googleapis.com/v1beta";
const REPORT_DAYS: u32 = 28;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
pub const CACHE_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DailyTraffic {
    pub date: String,
    pub sessions: u64,
    pub active_users: u64,
    pub page_views: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnalyticsSummary {
    pub days: Vec<DailyTraffic>,
    pub total_sessions: u64,
    pub total_active_users: u64,
    pub total_page_views: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunReportResponse {
    #[serde(default)]
    rows: Vec<ReportRow>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportRow {
    #[serde(default)]
    dimension_values: Vec<ReportValue>,
    #[serde(default)]
    metric_values: Vec<ReportValue>,
}

#[derive(Debug, Deserialize)]
struct ReportValue {
    #[serde(default)]
    value: String,
}

impl AnalyticsSummary {
    fn from_report(report: RunReportResponse) -> Self {
        let metric = |row: &ReportRow, index: usize| {
            row.metric_values
                .get(index)
                .and_then(|v| v.value.parse::<u64>().ok())
                .unwrap_or(0)
        };

        let mut days: Vec<DailyTraffic> = report
            .rows
            .iter()
            .map(|row| DailyTraffic {
                date: row
                    .dimension_values
                    .first()
                    .map(|v| v.value.clone())
                    .unwrap_or_default(),
                sessions: metric(row, 0),
                active_users: metric(row, 1),
                page_views: metric(row, 2),
            })
            .collect();
        days.sort_by(|a, b| a.date.cmp(&b.date));

        Self {
            total_sessions: days.iter().map(|d| d.sessions).sum(),
            total_active_users: days.iter().map(|d| d.active_users).sum(),
            total_page_views: days.iter().map(|d| d.page_views).sum(),
            days,
        }
    }
}

pub struct AnalyticsService {
    client: Client,
    property_id: String,
    access_token: String,
    cache: Mutex<Option<(Instant, AnalyticsSummary)>>,
}

impl AnalyticsService {
    pub fn new(client: Client, property_id: String, access_token: String) -> Self {
        Self {
            client,
            property_id,
            access_token,
            cache: Mutex::new(None),
        }
    }

    /// `None` unless both the GA4 property and access token are configured.
    pub fn from_config(config: &Config) -> Result<Option<Self>> {
        let (Some(property_id), Some(access_token)) =
            (&config.ga4_property_id, &config.ga4_access_token)
        else {
            return Ok(None);
        };
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| anyhow!("Failed to initialize HTTP client: {}", e))?;
        Ok(Some(Self::new(
            client,
            property_id.clone(),
            access_token.clone(),
        )))
    }

    pub async fn summary(&self) -> Result<AnalyticsSummary> {
        if let Some(cached) = self.cached_at(Instant::now()) {
            return Ok(cached);
        }

        let summary = self.fetch().await?;
        self.store(Instant::now(), summary.clone());
        Ok(summary)
    }

    /// Drops the cached summary. Returns whether one was cached.
    pub fn invalidate(&self) -> bool {
        self.cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
            .is_some()
    }

    pub(crate) fn cached_at(&self, now: Instant) -> Option<AnalyticsSummary> {
        let cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        cache
            .as_ref()
            .filter(|(stored_at, _)| now.duration_since(*stored_at) < CACHE_TTL)
            .map(|(_, summary)| summary.clone())
    }

    pub(crate) fn store(&self, now: Instant, summary: AnalyticsSummary) {
        *self.cache.lock().unwrap_or_else(|e| e.into_inner()) = Some((now, summary));
    }

    async fn fetch(&self) -> Result<AnalyticsSummary> {
        let url = format!("{}/properties/{}:runReport", GA4_API_BASE, self.property_id);
        let body = json!({
            "dateRanges": [{ "startDate": format!("{}daysAgo", REPORT_DAYS), "endDate": "today" }],
            "dimensions": [{ "name": "date" }],
            "metrics": [
                { "name": "sessions" },
                { "name": "activeUsers" },
                { "name": "screenPageViews" }
            ]
        });

        let report: RunReportResponse = self
            .client
            .post(url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let summary = AnalyticsSummary::from_report(report);
        tracing::debug!(days = summary.days.len(), "Fetched GA4 report");
        Ok(summary)
    }
}
