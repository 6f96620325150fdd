//! Cart Aggregate

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// A user's cart: at most one entry per product.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Cart {
    items: Vec<CartItem>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: Uuid,
    pub quantity: u32,
}

impl Cart {
    pub fn from_items(items: Vec<CartItem>) -> Self {
        let mut cart = Self::default();
        for item in items { cart.add_item(item.product_id, item.quantity); }
        cart
    }

    pub fn items(&self) -> &[CartItem] { &self.items }
    pub fn item_count(&self) -> usize { self.items.len() }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }
    pub fn quantity_of(&self, product_id: Uuid) -> Option<u32> {
        self.items.iter().find(|i| i.product_id == product_id).map(|i| i.quantity)
    }

    /// Merges into an existing entry instead of duplicating it.
    pub fn add_item(&mut self, product_id: Uuid, quantity: u32) {
        if let Some(existing) = self.items.iter_mut().find(|i| i.product_id == product_id) {
            existing.quantity = existing.quantity.saturating_add(quantity);
        } else {
            self.items.push(CartItem { product_id, quantity });
        }
    }

    /// Replaces the quantity of an existing entry.
    pub fn update_quantity(&mut self, product_id: Uuid, quantity: u32) -> Result<()> {
        if quantity < 1 { return Err(Error::validation("Quantity must be at least 1")); }
        let item = self.items.iter_mut().find(|i| i.product_id == product_id)
            .ok_or_else(|| Error::not_found("Product not in cart"))?;
        item.quantity = quantity;
        Ok(())
    }

    /// Removing an absent product is not an error.
    pub fn remove_item(&mut self, product_id: Uuid) {
        self.items.retain(|i| i.product_id != product_id);
    }

    pub fn clear(&mut self) { self.items.clear(); }
}
