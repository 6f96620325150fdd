use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::extract::{AuthUser, ValidJson};
use super::AppState;
use crate::domain::payment::LineItem;
use crate::error::Result;
use crate::services::ReconciliationReport;

pub fn routes() -> Router<AppState> {
    Router::new().route("/complete", post(complete))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CompleteCheckoutRequest {
    pub items: Vec<LineItem>,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub message: &'static str,
    #[serde(flatten)]
    pub report: ReconciliationReport,
}

/// Applies the caller's purchased items to stock and empties their cart.
/// Not deduplicated: posting the same items twice decrements twice.
async fn complete(State(s): State<AppState>, AuthUser(user): AuthUser, ValidJson(r): ValidJson<CompleteCheckoutRequest>) -> Result<Json<CheckoutResponse>> {
    let report = s.reconciler.reconcile_stock(user.id, &r.items).await?;
    Ok(Json(CheckoutResponse { message: "Stock updated", report }))
}
