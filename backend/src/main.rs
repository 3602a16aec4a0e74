use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use studio_backend::{
    config::Config,
    db::{connection::create_optional_pool, redis::create_redis_pool},
    routes::build_router,
    state::AppState,
};

fn mask_secret(s: Option<&str>) -> String {
    match s {
        None | Some("") => "<unset>".into(),
        Some(s) => {
            let prefix = s.chars().take(2).collect::<String>();
            format!("{}*** (len={})", prefix, s.chars().count())
        }
    }
}

fn mask_url(url: Option<&str>) -> String {
    match url.and_then(|raw| url::Url::parse(raw).ok()) {
        Some(mut parsed) => {
            if parsed.password().is_some() {
                let _ = parsed.set_password(Some("***"));
            }
            parsed.to_string()
        }
        None => "<unset>".into(),
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = ?err, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "studio_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;
    tracing::info!(
        bind_addr = %config.bind_addr,
        production_mode = config.production_mode,
        database_url = %mask_url(config.database_url.as_deref()),
        redis_url = %mask_url(config.redis_url.as_deref()),
        console_access_token = %mask_secret(config.console_access_token.as_deref()),
        session_hash_cost = config.session_hash_cost,
        session_ttl_hours = config.session_ttl_hours,
        legacy_cookie_allowed = config.legacy_cookie_allowed(),
        allowed_origins = ?config.allowed_origins,
        analytics_configured = config.analytics_configured(),
        "Loaded configuration from environment/.env"
    );

    let db_pool = create_optional_pool(config.database_url.as_deref()).await?;
    let redis_pool = create_redis_pool(&config).await?;
    let bind_addr = config.bind_addr.clone();

    let state = AppState::from_config(config, db_pool, redis_pool).await?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Server listening on {}", bind_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
