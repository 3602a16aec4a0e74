use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use crate::{
    error::panic_response,
    handlers,
    middleware::{log_error_responses, request_gate, request_id, require_console_session},
    state::AppState,
};

pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health))
        .route(
            "/api/console/login",
            get(handlers::console_auth::session_status).post(handlers::console_auth::login),
        )
        .route("/api/console/logout", post(handlers::console_auth::logout))
        .route("/api/quote", post(handlers::quotes::submit_quote));

    let console_routes = Router::new()
        .route("/api/console/leads", get(handlers::leads::list_leads))
        .route(
            "/api/console/analytics",
            get(handlers::analytics::analytics_summary),
        )
        .route(
            "/api/console/cache/purge",
            post(handlers::cache::purge_cache),
        )
        .route_layer(from_fn_with_state(state.clone(), require_console_session));

    Router::new()
        .merge(public_routes)
        .merge(console_routes)
        .fallback(handlers::health::not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(from_fn(request_id))
                .layer(from_fn(log_error_responses))
                .layer(from_fn_with_state(state.gate.clone(), request_gate))
                .layer(CatchPanicLayer::custom(panic_response)),
        )
        .with_state(state)
}
