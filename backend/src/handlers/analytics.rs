use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::{error::AppError, state::AppState};

pub async fn analytics_summary(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let analytics = state
        .analytics
        .as_ref()
        .ok_or_else(|| AppError::NotConfigured("Analytics is not configured".into()))?;

    let summary = analytics.summary().await.map_err(|err| {
        tracing::warn!(error = ?err, "GA4 report request failed");
        AppError::BadGateway("Analytics provider unavailable".into())
    })?;
    Ok(Json(json!({ "success": true, "data": summary })))
}
