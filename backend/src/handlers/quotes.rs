use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::quote::{QuoteRecord, QuoteRequestPayload},
    state::AppState,
    utils::{extract_client_ip, extract_user_agent},
    validation::Validate,
};

pub async fn submit_quote(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<QuoteRequestPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let client_ip = extract_client_ip(&headers);
    let key = format!("quote:{}", client_ip);
    if !state.rate_limiter.allow(&key, state.quote_policy()).await {
        return Err(AppError::TooManyRequests);
    }

    let Json(payload) = payload?;
    if payload.is_honeypot_filled() {
        tracing::info!(client_ip = %client_ip, "Quote honeypot triggered; discarding submission");
        return Ok((StatusCode::CREATED, Json(json!({ "success": true }))));
    }

    let payload = payload.sanitized();
    payload.validate()?;
    if !payload.privacy_consent {
        return Err(AppError::BadRequest("Privacy consent is required".into()));
    }

    let repo = state.quotes.as_ref().ok_or_else(|| {
        AppError::NotConfigured("Quote submissions are temporarily unavailable".into())
    })?;

    let record = QuoteRecord::from_payload(
        Uuid::new_v4().to_string(),
        payload,
        client_ip,
        extract_user_agent(&headers),
        Utc::now(),
    );
    repo.insert(&record).await?;
    tracing::info!(quote_id = %record.id, timeline = %record.timeline, "Quote request stored");

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "id": record.id })),
    ))
}
