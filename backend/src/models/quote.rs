use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::validation::{
    rules::{validate_phone, validate_services},
    sanitize::{normalize_email, normalize_phone, sanitize_text},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timeline {
    Asap,
    OneToThreeMonths,
    ThreeToSixMonths,
    Flexible,
}

impl Timeline {
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeline::Asap => "asap",
            Timeline::OneToThreeMonths => "one_to_three_months",
            Timeline::ThreeToSixMonths => "three_to_six_months",
            Timeline::Flexible => "flexible",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct QuoteRequestPayload {
    #[validate(length(min = 2, max = 100))]
    pub name: String,
    #[validate(email, length(max = 254))]
    pub email: String,
    #[serde(default)]
    #[validate(custom(function = "validate_phone"))]
    pub phone: Option<String>,
    #[serde(default)]
    #[validate(length(max = 150))]
    pub company: Option<String>,
    #[serde(default)]
    #[validate(length(max = 50))]
    pub company_size: Option<String>,
    #[serde(default)]
    #[validate(length(max = 100))]
    pub industry: Option<String>,
    #[serde(default)]
    #[validate(length(max = 50))]
    pub budget: Option<String>,
    #[serde(default)]
    #[validate(length(max = 10), custom(function = "validate_services"))]
    pub services: Vec<String>,
    #[validate(length(min = 20, max = 2000))]
    pub challenge: String,
    pub timeline: Timeline,
    #[serde(default)]
    pub privacy_consent: bool,
    /// Hidden form field; humans leave it empty.
    #[serde(default)]
    pub website: Option<String>,
}

impl QuoteRequestPayload {
    pub fn is_honeypot_filled(&self) -> bool {
        self.website
            .as_deref()
            .map(|value| !value.trim().is_empty())
            .unwrap_or(false)
    }

    /// Strips markup from every free-text field and normalizes contact data.
    /// Optional fields that end up empty become `None`.
    pub fn sanitized(self) -> Self {
        let optional = |value: Option<String>| {
            value
                .map(|v| sanitize_text(&v))
                .filter(|v| !v.is_empty())
        };
        Self {
            name: sanitize_text(&self.name),
            email: normalize_email(&self.email),
            phone: self
                .phone
                .map(|v| normalize_phone(&v))
                .filter(|v| !v.is_empty()),
            company: optional(self.company),
            company_size: optional(self.company_size),
            industry: optional(self.industry),
            budget: optional(self.budget),
            services: self
                .services
                .iter()
                .map(|s| sanitize_text(s))
                .filter(|s| !s.is_empty())
                .collect(),
            challenge: sanitize_text(&self.challenge),
            timeline: self.timeline,
            privacy_consent: self.privacy_consent,
            website: self.website,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct QuoteRecord {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub company_size: Option<String>,
    pub industry: Option<String>,
    pub budget: Option<String>,
    pub services: Vec<String>,
    pub challenge: String,
    pub timeline: String,
    pub privacy_consent: bool,
    pub consent_at: DateTime<Utc>,
    pub client_ip: String,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl QuoteRecord {
    pub fn from_payload(
        id: String,
        payload: QuoteRequestPayload,
        client_ip: String,
        user_agent: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name: payload.name,
            email: payload.email,
            phone: payload.phone,
            company: payload.company,
            company_size: payload.company_size,
            industry: payload.industry,
            budget: payload.budget,
            services: payload.services,
            challenge: payload.challenge,
            timeline: payload.timeline.as_str().to_string(),
            privacy_consent: payload.privacy_consent,
            consent_at: now,
            client_ip,
            user_agent,
            created_at: now,
        }
    }
}
