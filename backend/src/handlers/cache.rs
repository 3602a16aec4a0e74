use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::{error::AppError, state::AppState};

pub async fn purge_cache(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let report = state.cache_purge.purge().await?;
    Ok(Json(json!({
        "success": true,
        "deleted_keys": report.deleted_keys,
        "revalidated": report.revalidated,
        "analytics_cache_cleared": report.analytics_cache_cleared,
        "cdn": report.cdn,
    })))
}
