//! Creates a console access token and prints it once, or revokes one.
//! Only the hash is stored, so a lost token has to be replaced, not
//! recovered. Revoked tokens are deactivated, never deleted.
//!
//! Usage:
//!   `seed_console_token [description]`
//!   `seed_console_token --revoke <credential-id>`

use anyhow::Context;
use chrono::Utc;
use studio_backend::{
    config::Config,
    db::connection::{create_pool, run_migrations},
    models::credential::ConsoleCredential,
    repositories::{CredentialStore, PgCredentialStore},
    utils::{generate_console_token, SecretHasher},
};
use uuid::Uuid;

enum Command {
    Seed { description: String },
    Revoke { id: String },
}

fn parse_args(args: &[String]) -> anyhow::Result<Command> {
    match args.first().map(String::as_str) {
        Some("--revoke") => {
            let id = args
                .get(1)
                .map(|id| id.trim())
                .filter(|id| !id.is_empty())
                .context("--revoke needs a credential id")?;
            Ok(Command::Revoke { id: id.to_string() })
        }
        _ => {
            let description = args.join(" ");
            let description = if description.trim().is_empty() {
                format!("console token created {}", Utc::now().format("%Y-%m-%d"))
            } else {
                description.trim().to_string()
            };
            Ok(Command::Seed { description })
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = parse_args(&args)?;

    let config = Config::load()?;
    let database_url = config
        .database_url
        .as_deref()
        .context("DATABASE_URL is required to manage console tokens")?;
    let pool = create_pool(database_url).await?;
    run_migrations(&pool).await?;
    let store = PgCredentialStore::new(pool);

    match command {
        Command::Revoke { id } => {
            if store.deactivate(&id).await.context("revoke console token")? {
                tracing::info!(credential_id = %id, "Console token revoked");
            } else {
                anyhow::bail!("no active console token with id {}", id);
            }
        }
        Command::Seed { description } => {
            let token = generate_console_token();
            let token_hash = SecretHasher::new(config.session_hash_cost).hash(&token)?;
            let credential = ConsoleCredential {
                id: Uuid::new_v4().to_string(),
                token_hash,
                description,
                active: true,
                created_at: Utc::now(),
            };
            store
                .insert(&credential)
                .await
                .context("insert console token")?;

            tracing::info!(
                credential_id = %credential.id,
                description = %credential.description,
                "Console token created"
            );
            println!("{}", token);
        }
    }
    Ok(())
}
