use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use validator::Validate;

use super::extract::ValidJson;
use super::AppState;
use crate::error::{Error, Result};
use crate::services::ContactMessage;

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/contact", post(send_message))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ContactRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub message: String,
}

async fn send_message(State(s): State<AppState>, ValidJson(r): ValidJson<ContactRequest>) -> Result<Json<Value>> {
    let contact = s.contact.as_ref().ok_or_else(|| Error::ExternalService("Contact form is not configured".into()))?;
    contact.send_message(ContactMessage { name: r.name, email: r.email, message: r.message }).await?;
    Ok(Json(json!({ "message": "Message sent successfully" })))
}
