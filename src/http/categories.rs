use axum::{extract::{Path, State}, http::StatusCode, routing::get, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;
use validator::Validate;

use super::extract::{AdminUser, ValidJson};
use super::AppState;
use crate::domain::aggregates::{Category, CategoryPatch};
use crate::error::Result;
use crate::services::NewCategory;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_categories).post(create_category))
        .route("/:id", get(get_category).put(update_category).delete(delete_category))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, message = "is required"))]
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCategoryRequest {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
}

async fn list_categories(State(s): State<AppState>) -> Result<Json<Vec<Category>>> {
    Ok(Json(s.catalog.list_categories().await?))
}

async fn get_category(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Category>> {
    Ok(Json(s.catalog.get_category(id).await?))
}

async fn create_category(State(s): State<AppState>, _: AdminUser, ValidJson(r): ValidJson<CreateCategoryRequest>) -> Result<(StatusCode, Json<Category>)> {
    let category = s.catalog.create_category(NewCategory { name: r.name, slug: r.slug, description: r.description }).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

async fn update_category(State(s): State<AppState>, _: AdminUser, Path(id): Path<Uuid>, ValidJson(r): ValidJson<UpdateCategoryRequest>) -> Result<Json<Category>> {
    Ok(Json(s.catalog.update_category(id, CategoryPatch { name: r.name, slug: r.slug, description: r.description }).await?))
}

async fn delete_category(State(s): State<AppState>, _: AdminUser, Path(id): Path<Uuid>) -> Result<Json<Value>> {
    s.catalog.delete_category(id).await?;
    Ok(Json(json!({ "message": "Category removed" })))
}
