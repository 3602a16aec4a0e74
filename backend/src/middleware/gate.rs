//! Edge checks applied to every request before routing, plus the security
//! headers stamped on every response (rejections included).

use axum::{
    extract::{Request, State},
    http::{
        header::{self, HeaderName},
        HeaderMap, HeaderValue, Method, StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;

use crate::{
    config::Config,
    utils::{extract_client_ip, is_allowed_authority, origin_authority},
};

const BOT_SIGNATURES: &[&str] = &[
    "curl",
    "wget",
    "python-requests",
    "scrapy",
    "bot",
    "spider",
    "crawl",
    "slurp",
];
const SENSITIVE_FRAGMENTS: &[&str] = &[".env", ".git", "package.json", "node_modules"];
const API_PREFIX: &str = "/api";

#[derive(Debug, Clone)]
pub struct GateConfig {
    pub blocked_ips: Vec<String>,
    pub allowed_origins: Vec<String>,
}

impl GateConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            blocked_ips: config.blocked_ips.clone(),
            allowed_origins: config.allowed_origins.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateRejection {
    BlockedIp,
    SuspiciousAgent,
    InvalidOrigin,
    PathTraversal,
    SensitivePath,
}

impl GateRejection {
    pub fn status(&self) -> StatusCode {
        match self {
            GateRejection::BlockedIp
            | GateRejection::SuspiciousAgent
            | GateRejection::InvalidOrigin => StatusCode::FORBIDDEN,
            GateRejection::PathTraversal => StatusCode::BAD_REQUEST,
            GateRejection::SensitivePath => StatusCode::NOT_FOUND,
        }
    }

    fn message(&self) -> &'static str {
        match self {
            GateRejection::BlockedIp => "Access denied",
            GateRejection::SuspiciousAgent => "Automated access is not permitted",
            GateRejection::InvalidOrigin => "Invalid origin",
            GateRejection::PathTraversal => "Invalid path",
            GateRejection::SensitivePath => "Not found",
        }
    }

    fn code(&self) -> &'static str {
        match self {
            GateRejection::BlockedIp | GateRejection::SuspiciousAgent => "FORBIDDEN",
            GateRejection::InvalidOrigin => "INVALID_ORIGIN",
            GateRejection::PathTraversal => "BAD_REQUEST",
            GateRejection::SensitivePath => "NOT_FOUND",
        }
    }
}

impl IntoResponse for GateRejection {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "success": false,
            "error": self.message(),
            "code": self.code(),
        }));
        (self.status(), body).into_response()
    }
}

fn is_state_changing(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

fn is_api_path(path: &str) -> bool {
    path == API_PREFIX || path.starts_with("/api/")
}

fn header_str<'a>(headers: &'a HeaderMap, name: HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Evaluates the gate checks in order and returns the first failure.
pub fn inspect(
    method: &Method,
    path: &str,
    headers: &HeaderMap,
    config: &GateConfig,
) -> Result<(), GateRejection> {
    let client_ip = extract_client_ip(headers);
    if config.blocked_ips.iter().any(|ip| ip == &client_ip) {
        return Err(GateRejection::BlockedIp);
    }

    if is_api_path(path) {
        let agent = header_str(headers, header::USER_AGENT)
            .map(str::trim)
            .unwrap_or_default()
            .to_ascii_lowercase();
        if agent.is_empty() || BOT_SIGNATURES.iter().any(|sig| agent.contains(sig)) {
            return Err(GateRejection::SuspiciousAgent);
        }
    }

    if is_state_changing(method) {
        // Origin, then Referer, then Host. The first header present decides;
        // an unparseable value (`Origin: null`) is a mismatch.
        let claimed = [header::ORIGIN, header::REFERER, header::HOST]
            .into_iter()
            .find_map(|name| headers.get(name));
        if let Some(value) = claimed {
            let allowed = value
                .to_str()
                .ok()
                .and_then(origin_authority)
                .is_some_and(|authority| {
                    is_allowed_authority(&authority, &config.allowed_origins)
                });
            if !allowed {
                return Err(GateRejection::InvalidOrigin);
            }
        }
    }

    let lowered = path.to_ascii_lowercase();
    if lowered.contains("..") || lowered.contains("//") || lowered.contains("%2e%2e") {
        return Err(GateRejection::PathTraversal);
    }

    if SENSITIVE_FRAGMENTS.iter().any(|frag| lowered.contains(frag)) {
        return Err(GateRejection::SensitivePath);
    }

    Ok(())
}

pub fn apply_security_headers(headers: &mut HeaderMap, is_api: bool) {
    let fixed: [(&'static str, &'static str); 6] = [
        (
            "strict-transport-security",
            "max-age=31536000; includeSubDomains",
        ),
        ("x-frame-options", "DENY"),
        ("x-content-type-options", "nosniff"),
        ("x-xss-protection", "1; mode=block"),
        ("referrer-policy", "strict-origin-when-cross-origin"),
        ("permissions-policy", "camera=(), microphone=(), geolocation=()"),
    ];
    for (name, value) in fixed {
        headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }
    if is_api {
        headers.insert(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store, no-cache, must-revalidate, private"),
        );
    }
}

pub async fn request_gate(
    State(config): State<Arc<GateConfig>>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let is_api = is_api_path(&path);

    let mut response = match inspect(request.method(), &path, request.headers(), &config) {
        Ok(()) => next.run(request).await,
        Err(rejection) => {
            tracing::warn!(
                reason = ?rejection,
                method = %request.method(),
                path = %path,
                client_ip = %extract_client_ip(request.headers()),
                "Request rejected at gate"
            );
            rejection.into_response()
        }
    };

    apply_security_headers(response.headers_mut(), is_api);
    response
}
