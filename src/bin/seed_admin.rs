//! Creates the initial administrator account.
//!
//! Reads `ADMIN_EMAIL`, `ADMIN_PASSWORD` and `ADMIN_NAME` (default "Admin")
//! alongside the usual server configuration. Does nothing when the email is
//! already registered.

use anyhow::{bail, Context, Result};
use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use herhair_store::repository::PgStore;
use herhair_store::services::{AuthService, Credentials, TokenSigner};
use herhair_store::{Config, Repositories};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();
    let config = Config::from_env()?;

    let Some(url) = &config.database_url else {
        bail!("DATABASE_URL must be set to seed an admin account");
    };
    let pool = PgPoolOptions::new().max_connections(1).connect(url.expose_secret()).await?;
    PgStore::new(pool.clone()).migrate().await?;

    let admin = Credentials {
        name: std::env::var("ADMIN_NAME").unwrap_or_else(|_| "Admin".to_string()),
        email: std::env::var("ADMIN_EMAIL").context("ADMIN_EMAIL must be set")?,
        password: std::env::var("ADMIN_PASSWORD").context("ADMIN_PASSWORD must be set")?,
    };
    let email = admin.email.clone();

    let repos = Repositories::postgres(pool);
    let auth = AuthService::new(repos.users, TokenSigner::new(config.jwt_secret_bytes(), config.token_ttl_days));
    if auth.ensure_admin(admin).await? {
        tracing::info!(%email, "admin user created");
    } else {
        tracing::info!(%email, "admin user already exists");
    }
    Ok(())
}
