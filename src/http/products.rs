use axum::{extract::{Path, State}, http::StatusCode, routing::{get, post}, Json, Router};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};
use uuid::Uuid;
use validator::Validate;

use super::extract::{AdminUser, OptionalJson, ValidJson};
use super::AppState;
use crate::domain::aggregates::{NewProduct, ProductPatch};
use crate::domain::value_objects::StockStatus;
use crate::error::Result;
use crate::services::ProductView;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products))
        .route("/new", post(create_product))
        .route("/status/:status", get(products_by_status))
        .route("/:id", get(get_product).put(update_product).delete(delete_product))
        .route("/:id/sell", post(sell_product))
        .route("/:id/restock", post(restock_product))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    #[validate(length(min = 1, message = "is required"))]
    pub name: String,
    pub price: Decimal,
    pub discounted_price: Option<Decimal>,
    #[serde(default)]
    pub images: Vec<String>,
    pub description: Option<String>,
    pub length: Option<String>,
    pub color: Option<String>,
    pub texture: Option<String>,
    pub category: Uuid,
    #[serde(default)]
    pub quantity: u32,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub name: Option<String>,
    pub price: Option<Decimal>,
    /// Absent keeps the discount, `null` clears it.
    #[serde(default, deserialize_with = "nullable")]
    pub discounted_price: Option<Option<Decimal>>,
    pub images: Option<Vec<String>>,
    pub description: Option<String>,
    pub length: Option<String>,
    pub color: Option<String>,
    pub texture: Option<String>,
    pub category: Option<Uuid>,
    pub quantity: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct StockAdjustmentRequest {
    #[serde(default = "one")]
    pub amount: u32,
}

fn one() -> u32 { 1 }

/// No body, no `amount`, or an amount of 0 all mean 1.
fn amount(body: Option<StockAdjustmentRequest>) -> u32 {
    body.map(|b| b.amount).filter(|a| *a > 0).unwrap_or(1)
}

fn nullable<'de, D, T>(de: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

async fn list_products(State(s): State<AppState>) -> Result<Json<Vec<ProductView>>> {
    Ok(Json(s.catalog.list_product_views(None).await?))
}

async fn products_by_status(State(s): State<AppState>, Path(status): Path<String>) -> Result<Json<Vec<ProductView>>> {
    let status: StockStatus = status.parse()?;
    Ok(Json(s.catalog.list_product_views(Some(status)).await?))
}

async fn get_product(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<ProductView>> {
    Ok(Json(s.catalog.get_product_view(id).await?))
}

async fn create_product(State(s): State<AppState>, _: AdminUser, ValidJson(r): ValidJson<CreateProductRequest>) -> Result<(StatusCode, Json<Value>)> {
    let product = s.catalog.create_product(NewProduct {
        name: r.name, price: r.price, discounted_price: r.discounted_price, images: r.images, description: r.description,
        length: r.length, color: r.color, texture: r.texture, category: r.category, quantity: r.quantity,
    }).await?;
    Ok((StatusCode::CREATED, Json(json!({ "message": "Product created", "product": product }))))
}

async fn update_product(State(s): State<AppState>, _: AdminUser, Path(id): Path<Uuid>, ValidJson(r): ValidJson<UpdateProductRequest>) -> Result<Json<Value>> {
    let product = s.catalog.update_product(id, ProductPatch {
        name: r.name, price: r.price, discounted_price: r.discounted_price, images: r.images, description: r.description,
        length: r.length, color: r.color, texture: r.texture, category: r.category, quantity: r.quantity,
    }).await?;
    Ok(Json(json!({ "message": "Product updated successfully", "product": product })))
}

async fn delete_product(State(s): State<AppState>, _: AdminUser, Path(id): Path<Uuid>) -> Result<Json<Value>> {
    let product = s.catalog.delete_product(id).await?;
    Ok(Json(json!({ "message": "Product deleted successfully", "product": product })))
}

async fn sell_product(State(s): State<AppState>, _: AdminUser, Path(id): Path<Uuid>, OptionalJson(body): OptionalJson<StockAdjustmentRequest>) -> Result<Json<Value>> {
    let product = s.catalog.sell_product(id, amount(body)).await?;
    Ok(Json(json!({ "message": "Stock updated", "product": product })))
}

async fn restock_product(State(s): State<AppState>, _: AdminUser, Path(id): Path<Uuid>, OptionalJson(body): OptionalJson<StockAdjustmentRequest>) -> Result<Json<Value>> {
    let product = s.catalog.restock_product(id, amount(body)).await?;
    Ok(Json(json!({ "message": "Stock restocked", "product": product })))
}
