//! Payment confirmations as delivered by the payment provider.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One purchased product quantity within a payment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub product_id: Uuid,
    pub quantity: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PaymentStatus {
    Success,
    /// Any provider status other than success, kept verbatim.
    NotSuccessful(String),
}

impl PaymentStatus {
    pub fn from_provider(status: &str) -> Self {
        if status == "success" { Self::Success } else { Self::NotSuccessful(status.to_string()) }
    }

    pub fn is_success(&self) -> bool { matches!(self, Self::Success) }
}

/// A verified payment, consumed at most once by stock reconciliation.
#[derive(Clone, Debug)]
pub struct PaymentConfirmation {
    pub reference: String,
    pub status: PaymentStatus,
    /// Amount in minor units (kobo).
    pub amount: i64,
    pub email: Option<String>,
    pub user_id: Option<Uuid>,
    pub line_items: Vec<LineItem>,
}
