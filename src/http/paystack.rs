use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use super::extract::{AuthUser, ValidJson};
use super::AppState;
use crate::domain::payment::LineItem;
use crate::error::{Error, Result};
use crate::integrations::paystack::WebhookEvent;
use crate::integrations::InitializePayment;

const SIGNATURE_HEADER: &str = "x-paystack-signature";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/init", post(initialize))
        .route("/verify/:reference", get(verify))
        .route("/webhook", post(webhook))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct InitializeRequest {
    #[validate(email(message = "must be a valid email"))]
    pub email: Option<String>,
    pub amount: Decimal,
    /// Defaults to a snapshot of the caller's cart.
    pub items: Option<Vec<LineItem>>,
}

async fn initialize(State(s): State<AppState>, AuthUser(user): AuthUser, ValidJson(r): ValidJson<InitializeRequest>) -> Result<Response> {
    let provider = s.payments()?;
    let line_items = match r.items {
        Some(items) => items,
        None => user.cart.items().iter().map(|i| LineItem { product_id: i.product_id, quantity: i.quantity }).collect(),
    };
    let session = provider
        .initialize(InitializePayment { email: r.email.unwrap_or(user.email), amount: r.amount, user_id: user.id, line_items })
        .await?;
    tracing::info!(user_id = %user.id, reference = %session.reference, "payment initialized");
    Ok(Json(json!({ "status": true, "message": "Authorization URL created", "data": session })).into_response())
}

async fn verify(State(s): State<AppState>, AuthUser(user): AuthUser, Path(reference): Path<String>) -> Result<Response> {
    let confirmation = s.payments()?.verify(&reference).await?;
    if !confirmation.status.is_success() {
        tracing::info!(%reference, status = ?confirmation.status, "payment not successful");
        return Ok((StatusCode::BAD_REQUEST, Json(json!({ "message": "Payment failed" }))).into_response());
    }
    let outcome = s.reconciler.reconcile_payment(&confirmation, Some(user.id)).await?;
    Ok(Json(json!({
        "message": "Payment verified",
        "data": { "reference": confirmation.reference, "amount": confirmation.amount, "email": confirmation.email },
        "reconciliation": outcome,
    }))
    .into_response())
}

async fn webhook(State(s): State<AppState>, headers: HeaderMap, body: Bytes) -> Result<StatusCode> {
    let provider = s.payments()?;
    let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok()).unwrap_or_default();
    if !provider.verify_webhook_signature(&body, signature) {
        tracing::warn!("webhook signature mismatch");
        return Err(Error::Unauthorized("Invalid signature".into()));
    }
    let event: WebhookEvent =
        serde_json::from_slice(&body).map_err(|e| Error::validation(format!("Malformed webhook body: {e}")))?;
    if event.event != "charge.success" {
        tracing::debug!(event = %event.event, "webhook event ignored");
        return Ok(StatusCode::OK);
    }

    let confirmation = event.data.into_confirmation();
    match s.reconciler.reconcile_payment(&confirmation, None).await {
        Ok(_) => Ok(StatusCode::OK),
        // Retrying cannot fix a payment without usable metadata.
        Err(Error::Validation(message)) => {
            tracing::warn!(reference = %confirmation.reference, %message, "webhook payment not reconciled");
            Ok(StatusCode::OK)
        }
        Err(err) => Err(err),
    }
}
