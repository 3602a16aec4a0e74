use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header::SET_COOKIE, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::{
    error::AppError,
    services::console_auth::LoginOutcome,
    state::AppState,
    utils::{
        cookies::{
            build_auth_cookie, build_clear_cookie, CONSOLE_COOKIE_PATH, LEGACY_COOKIE_NAME,
            SESSION_COOKIE_NAME,
        },
        extract_client_ip, extract_user_agent,
    },
};

#[derive(Deserialize)]
pub struct LoginRequest {
    pub token: String,
}

fn append_cookie(response: &mut Response, cookie: &str) -> Result<(), AppError> {
    let value = HeaderValue::from_str(cookie)
        .map_err(|e| AppError::InternalServerError(anyhow::anyhow!("Invalid cookie: {}", e)))?;
    response.headers_mut().append(SET_COOKIE, value);
    Ok(())
}

pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(payload) = payload?;
    let client_ip = extract_client_ip(&headers);
    let user_agent = extract_user_agent(&headers);

    let outcome = state
        .auth
        .login(&payload.token, &client_ip, user_agent.as_deref())
        .await?;

    let options = state.cookie_options();
    let legacy_ttl = Duration::from_secs(state.config.session_ttl_hours.max(1) as u64 * 3600);
    let cookie = match &outcome {
        LoginOutcome::Session(issued) => build_auth_cookie(
            SESSION_COOKIE_NAME,
            &issued.secret,
            (issued.expires_at - Utc::now()).to_std().unwrap_or(legacy_ttl),
            CONSOLE_COOKIE_PATH,
            options,
        ),
        LoginOutcome::LegacyCookie(token) => build_auth_cookie(
            LEGACY_COOKIE_NAME,
            token,
            legacy_ttl,
            CONSOLE_COOKIE_PATH,
            options,
        ),
    };

    let mut response = Json(json!({ "success": true })).into_response();
    append_cookie(&mut response, &cookie)?;
    Ok(response)
}

pub async fn session_status(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Json<serde_json::Value> {
    let authenticated = state.auth.is_authenticated(&headers).await;
    Json(json!({ "authenticated": authenticated }))
}

/// Always succeeds; both cookie names are overwritten with expired values.
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    state.auth.logout(&headers).await;

    let options = state.cookie_options();
    let mut response = Json(json!({ "success": true })).into_response();
    for name in [SESSION_COOKIE_NAME, LEGACY_COOKIE_NAME] {
        append_cookie(
            &mut response,
            &build_clear_cookie(name, CONSOLE_COOKIE_PATH, options),
        )?;
    }
    Ok(response)
}
