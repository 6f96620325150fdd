//! Service configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `JWT_SECRET` - HMAC key for access tokens (min 16 chars)
//!
//! ## Optional
//! - `DATABASE_URL` - Postgres connection string; in-memory store when unset
//! - `DB_MAX_CONNECTIONS` - Pool size (default: 10)
//! - `HOST` - Bind address (default: 0.0.0.0)
//! - `PORT` - Listen port (default: 5000)
//! - `TOKEN_TTL_DAYS` - Access token lifetime, 1 to 3650 days (default: 30)
//! - `PAYSTACK_SECRET_KEY` - Enables the payment routes
//! - `PAYSTACK_BASE_URL` - Provider base URL (default: <https://api.paystack.co>)
//! - `RESEND_API_KEY` - Enables the contact route; requires `CONTACT_TO`
//! - `CONTACT_FROM` - Sender address (default: onboarding@resend.dev)
//! - `NATS_URL` - Publish domain events to NATS

use std::net::{IpAddr, SocketAddr};

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use crate::services::auth::MAX_TOKEN_TTL_DAYS;

const MIN_JWT_SECRET_LENGTH: usize = 16;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub database_url: Option<SecretString>,
    pub db_max_connections: u32,
    pub jwt_secret: SecretString,
    pub token_ttl_days: i64,
    pub paystack: Option<PaystackConfig>,
    pub resend: Option<ResendConfig>,
    pub nats_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PaystackConfig {
    pub secret_key: SecretString,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct ResendConfig {
    pub api_key: SecretString,
    pub from: String,
    pub to: String,
}

impl Config {
    /// Load configuration, reading `.env` first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(&lookup);

        let jwt_secret = env.required("JWT_SECRET")?;
        if jwt_secret.len() < MIN_JWT_SECRET_LENGTH {
            return Err(ConfigError::InvalidEnvVar(
                "JWT_SECRET".into(),
                format!("must be at least {MIN_JWT_SECRET_LENGTH} characters"),
            ));
        }

        let token_ttl_days: i64 = env.parsed("TOKEN_TTL_DAYS", "30")?;
        if !(1..=MAX_TOKEN_TTL_DAYS).contains(&token_ttl_days) {
            return Err(ConfigError::InvalidEnvVar(
                "TOKEN_TTL_DAYS".into(),
                format!("must be between 1 and {MAX_TOKEN_TTL_DAYS}"),
            ));
        }

        let paystack = env.optional("PAYSTACK_SECRET_KEY").map(|key| PaystackConfig {
            secret_key: SecretString::from(key),
            base_url: env.or_default("PAYSTACK_BASE_URL", "https://api.paystack.co").trim_end_matches('/').to_string(),
        });

        let resend = match env.optional("RESEND_API_KEY") {
            Some(key) => Some(ResendConfig {
                api_key: SecretString::from(key),
                from: env.or_default("CONTACT_FROM", "onboarding@resend.dev"),
                to: env.required("CONTACT_TO")?,
            }),
            None => None,
        };

        Ok(Self {
            host: env.parsed("HOST", "0.0.0.0")?,
            port: env.parsed("PORT", "5000")?,
            database_url: env.optional("DATABASE_URL").map(SecretString::from),
            db_max_connections: env.parsed("DB_MAX_CONNECTIONS", "10")?,
            jwt_secret: SecretString::from(jwt_secret),
            token_ttl_days,
            paystack,
            resend,
            nats_url: env.optional("NATS_URL"),
        })
    }

    pub fn socket_addr(&self) -> SocketAddr { SocketAddr::new(self.host, self.port) }

    pub fn jwt_secret_bytes(&self) -> &[u8] { self.jwt_secret.expose_secret().as_bytes() }
}

struct Env<'a, F: Fn(&str) -> Option<String>>(&'a F);

impl<F: Fn(&str) -> Option<String>> Env<'_, F> {
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
    }

    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn parsed<T>(&self, key: &str, default: &str) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.or_default(key, default)
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    }
}
