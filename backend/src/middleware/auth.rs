use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::{error::AppError, state::AppState};

/// Guards console routes. The session is re-verified against the store on
/// every request; a cookie that merely looks unexpired is not enough.
pub async fn require_console_session(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !state.auth.is_authenticated(request.headers()).await {
        tracing::debug!(path = %request.uri().path(), "Console request without a valid session");
        return Err(AppError::Unauthorized("Unauthorized".into()));
    }
    Ok(next.run(request).await)
}
