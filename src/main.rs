//! HerHair storefront API server

use std::sync::Arc;

use anyhow::Result;
use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use herhair_store::integrations::{PaystackClient, ResendClient};
use herhair_store::messaging::EventPublisher;
use herhair_store::repository::PgStore;
use herhair_store::services::{ContactService, TokenSigner};
use herhair_store::{router, AppState, Config, Repositories};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();
    let config = Config::from_env()?;

    let repos = match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new().max_connections(config.db_max_connections).connect(url.expose_secret()).await?;
            PgStore::new(pool.clone()).migrate().await?;
            tracing::info!("using postgres storage");
            Repositories::postgres(pool)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory storage; data is lost on restart");
            Repositories::memory()
        }
    };
    let events = EventPublisher::connect(config.nats_url.as_deref()).await;
    let tokens = TokenSigner::new(config.jwt_secret_bytes(), config.token_ttl_days);

    let mut state = AppState::new(repos, events, tokens);
    match &config.paystack {
        Some(paystack) => state = state.with_payments(Arc::new(PaystackClient::new(paystack))),
        None => tracing::warn!("PAYSTACK_SECRET_KEY not set, payment routes are disabled"),
    }
    match &config.resend {
        Some(resend) => state = state.with_contact(ContactService::from_config(Arc::new(ResendClient::new(resend)), resend)),
        None => tracing::warn!("RESEND_API_KEY not set, contact route is disabled"),
    }

    let addr = config.socket_addr();
    tracing::info!("HerHair store listening on {}", addr);
    axum::serve(tokio::net::TcpListener::bind(addr).await?, router(state)).await?;
    Ok(())
}
