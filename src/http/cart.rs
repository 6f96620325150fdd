use axum::{extract::{Path, State}, routing::{delete, get, post, put}, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;
use validator::Validate;

use super::extract::{AuthUser, ValidJson};
use super::AppState;
use crate::error::Result;
use crate::services::CartLine;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(get_cart))
        .route("/add", post(add_to_cart))
        .route("/update", put(update_cart))
        .route("/remove/:product_id", delete(remove_from_cart))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    pub product_id: Uuid,
    pub quantity: Option<u32>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCartRequest {
    pub product_id: Uuid,
    pub quantity: u32,
}

async fn get_cart(State(s): State<AppState>, AuthUser(user): AuthUser) -> Result<Json<Vec<CartLine>>> {
    Ok(Json(s.cart.get_cart(user.id).await?))
}

async fn add_to_cart(State(s): State<AppState>, AuthUser(user): AuthUser, ValidJson(r): ValidJson<AddToCartRequest>) -> Result<Json<Value>> {
    let cart = s.cart.add_item(user.id, r.product_id, r.quantity).await?;
    Ok(Json(json!({ "message": "Added to cart", "cart": cart })))
}

async fn update_cart(State(s): State<AppState>, AuthUser(user): AuthUser, ValidJson(r): ValidJson<UpdateCartRequest>) -> Result<Json<Value>> {
    let cart = s.cart.update_item(user.id, r.product_id, r.quantity).await?;
    Ok(Json(json!({ "message": "Cart updated", "cart": cart })))
}

async fn remove_from_cart(State(s): State<AppState>, AuthUser(user): AuthUser, Path(product_id): Path<Uuid>) -> Result<Json<Value>> {
    let cart = s.cart.remove_item(user.id, product_id).await?;
    Ok(Json(json!({ "message": "Removed", "cart": cart })))
}
