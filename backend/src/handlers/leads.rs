use axum::{
    extract::{Query, State},
    Json,
};

use crate::{
    error::AppError,
    models::{quote::QuoteRecord, PaginatedResponse, PaginationQuery},
    state::AppState,
};

/// Newest first.
pub async fn list_leads(
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<PaginatedResponse<QuoteRecord>>, AppError> {
    let repo = state
        .quotes
        .as_ref()
        .ok_or_else(|| AppError::NotConfigured("Lead storage is not configured".into()))?;

    let (limit, offset) = (query.limit(), query.offset());
    let leads = repo.list(limit, offset).await?;
    let total = repo.count().await?;
    Ok(Json(PaginatedResponse::new(leads, total, limit, offset)))
}
