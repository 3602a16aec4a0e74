use std::sync::Arc;

use anyhow::Context;
use studio_backend::{
    config::Config,
    db::connection::create_pool,
    repositories::PgSessionStore,
    services::session::SessionManager,
    utils::SecretHasher,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let config = Config::load()?;
    let database_url = config
        .database_url
        .as_deref()
        .context("DATABASE_URL is required to clean up sessions")?;
    let pool = create_pool(database_url).await?;

    let sessions = SessionManager::new(
        Arc::new(PgSessionStore::new(pool.clone())),
        SecretHasher::new(config.session_hash_cost),
        chrono::Duration::hours(config.session_ttl_hours),
    );
    let deleted = sessions
        .purge_expired()
        .await
        .context("cleanup expired console sessions")?;
    if deleted > 0 {
        tracing::info!("Deleted {} expired console sessions", deleted);
    }

    sqlx::query("VACUUM (ANALYZE) console_sessions")
        .execute(&pool)
        .await
        .context("vacuum console_sessions table")?;

    Ok(())
}
