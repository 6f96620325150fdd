use axum::{extract::State, http::StatusCode, routing::{get, post}, Json, Router};
use serde::Deserialize;
use validator::Validate;

use super::extract::{AuthUser, ValidJson};
use super::AppState;
use crate::domain::aggregates::User;
use crate::error::Result;
use crate::services::{AuthSession, Credentials};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(me))
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

async fn register(State(s): State<AppState>, ValidJson(r): ValidJson<RegisterRequest>) -> Result<(StatusCode, Json<AuthSession>)> {
    let session = s.auth.register(Credentials { name: r.name, email: r.email, password: r.password }).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

async fn login(State(s): State<AppState>, ValidJson(r): ValidJson<LoginRequest>) -> Result<Json<AuthSession>> {
    Ok(Json(s.auth.login(&r.email, &r.password).await?))
}

async fn me(AuthUser(user): AuthUser) -> Json<User> { Json(user) }
