//! Domain events
use serde::Serialize;
use uuid::Uuid;

use crate::domain::value_objects::StockStatus;

#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum DomainEvent {
    Product(ProductEvent),
    Checkout(CheckoutEvent),
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProductEvent {
    Created { product_id: Uuid, name: String },
    StockAdjusted { product_id: Uuid, quantity: u32, status: StockStatus },
    Deleted { product_id: Uuid },
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CheckoutEvent {
    StockReconciled { user_id: Uuid, reference: Option<String>, applied: usize, skipped: Vec<Uuid> },
}

impl DomainEvent {
    /// NATS subject the event is published on.
    pub fn subject(&self) -> &'static str {
        match self {
            Self::Product(ProductEvent::Created { .. }) => "herhair.product.created",
            Self::Product(ProductEvent::StockAdjusted { .. }) => "herhair.product.stock_adjusted",
            Self::Product(ProductEvent::Deleted { .. }) => "herhair.product.deleted",
            Self::Checkout(CheckoutEvent::StockReconciled { .. }) => "herhair.checkout.stock_reconciled",
        }
    }
}
