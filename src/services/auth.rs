//! Accounts, password hashing and access tokens.

use std::sync::Arc;

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

use crate::domain::aggregates::user::normalize_email;
use crate::domain::aggregates::User;
use crate::error::{Error, Result};
use crate::repository::UserRepository;

type HmacSha256 = Hmac<Sha256>;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

#[derive(Clone, Debug, Default)]
pub struct Credentials {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// What register and login hand back to the client.
#[derive(Clone, Debug, Serialize)]
pub struct AuthSession {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: Uuid,
    iat: i64,
    exp: i64,
}

/// Longest access token lifetime accepted from configuration.
pub const MAX_TOKEN_TTL_DAYS: i64 = 3650;

/// Issues and checks compact HS256 JWTs.
#[derive(Clone)]
pub struct TokenSigner {
    key: Arc<[u8]>,
    ttl: Duration,
}

impl TokenSigner {
    /// `ttl_days` is clamped to `±MAX_TOKEN_TTL_DAYS`.
    pub fn new(secret: &[u8], ttl_days: i64) -> Self {
        let ttl_days = ttl_days.clamp(-MAX_TOKEN_TTL_DAYS, MAX_TOKEN_TTL_DAYS);
        Self { key: Arc::from(secret), ttl: Duration::days(ttl_days) }
    }

    pub fn issue(&self, user_id: Uuid) -> Result<String> {
        let now = Utc::now();
        let expires = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| Error::validation("Token lifetime is out of range"))?;
        let claims = Claims { sub: user_id, iat: now.timestamp(), exp: expires.timestamp() };
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = serde_json::to_vec(&claims).map_err(|e| Error::Storage(e.to_string()))?;
        let signing_input = format!("{header}.{}", URL_SAFE_NO_PAD.encode(payload));
        let signature = URL_SAFE_NO_PAD.encode(self.mac(signing_input.as_bytes())?.finalize().into_bytes());
        Ok(format!("{signing_input}.{signature}"))
    }

    /// Returns the user id the token was issued for.
    pub fn verify(&self, token: &str) -> Result<Uuid> {
        let unauthorized = || Error::Unauthorized("Not authorized, token failed".into());

        let (signing_input, signature) = token.rsplit_once('.').ok_or_else(unauthorized)?;
        let (header, payload) = signing_input.split_once('.').ok_or_else(unauthorized)?;
        let signature = URL_SAFE_NO_PAD.decode(signature).map_err(|_| unauthorized())?;
        self.mac(signing_input.as_bytes())?.verify_slice(&signature).map_err(|_| unauthorized())?;

        let header: serde_json::Value =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(header).map_err(|_| unauthorized())?).map_err(|_| unauthorized())?;
        if header["alg"] != "HS256" {
            return Err(unauthorized());
        }
        let claims: Claims =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(payload).map_err(|_| unauthorized())?).map_err(|_| unauthorized())?;
        if claims.exp <= Utc::now().timestamp() {
            return Err(Error::Unauthorized("Not authorized, token expired".into()));
        }
        Ok(claims.sub)
    }

    fn mac(&self, input: &[u8]) -> Result<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.key).map_err(|e| Error::Storage(e.to_string()))?;
        mac.update(input);
        Ok(mac)
    }
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    tokens: TokenSigner,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserRepository>, tokens: TokenSigner) -> Self {
        Self { users, tokens }
    }

    pub async fn register(&self, input: Credentials) -> Result<AuthSession> {
        if input.password.is_empty() {
            return Err(Error::validation("Please provide all required fields"));
        }
        let email = normalize_email(&input.email);
        if self.users.find_user_by_email(&email).await?.is_some() {
            return Err(Error::conflict("User already exists"));
        }
        let hash = hash_password(input.password).await?;
        let user = User::register(&input.name, &email, hash, false)?;
        self.users.insert_user(&user).await?;
        tracing::info!(user_id = %user.id, "user registered");
        self.session(user)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(Error::validation("Please provide all required fields"));
        }
        let user = self
            .users
            .find_user_by_email(&normalize_email(email))
            .await?
            .ok_or_else(|| Error::Unauthorized(INVALID_CREDENTIALS.into()))?;
        if !verify_password(password.to_string(), user.password_hash.clone()).await? {
            tracing::debug!(user_id = %user.id, "password mismatch");
            return Err(Error::Unauthorized(INVALID_CREDENTIALS.into()));
        }
        self.session(user)
    }

    /// Resolves a bearer token to its user.
    pub async fn authenticate(&self, token: &str) -> Result<User> {
        let user_id = self.tokens.verify(token)?;
        self.users
            .find_user(user_id)
            .await?
            .ok_or_else(|| Error::Unauthorized("Not authorized, user not found".into()))
    }

    /// Creates the administrator account unless the email is already taken.
    /// Returns true when an account was created.
    pub async fn ensure_admin(&self, input: Credentials) -> Result<bool> {
        let email = normalize_email(&input.email);
        if self.users.find_user_by_email(&email).await?.is_some() {
            return Ok(false);
        }
        if input.password.is_empty() {
            return Err(Error::validation("Admin password is required"));
        }
        let hash = hash_password(input.password).await?;
        let admin = User::register(&input.name, &email, hash, true)?;
        self.users.insert_user(&admin).await?;
        tracing::info!(user_id = %admin.id, "admin account created");
        Ok(true)
    }

    fn session(&self, user: User) -> Result<AuthSession> {
        let token = self.tokens.issue(user.id)?;
        Ok(AuthSession { id: user.id, name: user.name, email: user.email, token })
    }
}

/// Argon2id with a fresh salt; runs off the async executor.
async fn hash_password(password: String) -> Result<String> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| Error::Storage(format!("password hashing failed: {e}")))
    })
    .await
    .map_err(|e| Error::Storage(e.to_string()))?
}

async fn verify_password(password: String, hash: String) -> Result<bool> {
    tokio::task::spawn_blocking(move || {
        let Ok(parsed) = PasswordHash::new(&hash) else { return false };
        Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok()
    })
    .await
    .map_err(|e| Error::Storage(e.to_string()))
}
