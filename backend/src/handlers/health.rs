use axum::Json;
use serde_json::{json, Value};

use crate::error::AppError;

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn not_found() -> AppError {
    AppError::NotFound("Not found".into())
}
