use axum::{extract::{Path, State}, routing::{delete, get, post}, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;
use validator::Validate;

use super::extract::{AuthUser, ValidJson};
use super::AppState;
use crate::error::Result;
use crate::services::FavoriteEntry;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(get_favorites))
        .route("/add", post(add_favorite))
        .route("/remove/:product_id", delete(remove_favorite))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteRequest {
    pub product_id: Uuid,
}

async fn get_favorites(State(s): State<AppState>, AuthUser(user): AuthUser) -> Result<Json<Vec<FavoriteEntry>>> {
    Ok(Json(s.favorites.get_favorites(user.id).await?))
}

async fn add_favorite(State(s): State<AppState>, AuthUser(user): AuthUser, ValidJson(r): ValidJson<FavoriteRequest>) -> Result<Json<Value>> {
    let favorites = s.favorites.add_favorite(user.id, r.product_id).await?;
    Ok(Json(json!({ "message": "Added to favorites", "favorites": favorites })))
}

async fn remove_favorite(State(s): State<AppState>, AuthUser(user): AuthUser, Path(product_id): Path<Uuid>) -> Result<Json<Value>> {
    let favorites = s.favorites.remove_favorite(user.id, product_id).await?;
    Ok(Json(json!({ "message": "Removed", "favorites": favorites })))
}
