//! Per-user cart.

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::domain::aggregates::{Cart, Product, User};
use crate::error::{Error, Result};
use crate::repository::{CatalogRepository, UserRepository};

/// A cart entry with its product resolved for display.
///
/// `product` is `None` when the product has since been deleted.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: Uuid,
    pub quantity: u32,
    pub product: Option<Product>,
}

#[derive(Clone)]
pub struct CartService {
    users: Arc<dyn UserRepository>,
    catalog: Arc<dyn CatalogRepository>,
}

impl CartService {
    pub fn new(users: Arc<dyn UserRepository>, catalog: Arc<dyn CatalogRepository>) -> Self {
        Self { users, catalog }
    }

    /// Adds `quantity` (default 1) to the product's entry, creating it if needed.
    pub async fn add_item(&self, user_id: Uuid, product_id: Uuid, quantity: Option<u32>) -> Result<Cart> {
        if self.catalog.find_product(product_id).await?.is_none() {
            return Err(Error::not_found("Product not found"));
        }
        self.users.add_cart_item(user_id, product_id, quantity.filter(|q| *q > 0).unwrap_or(1)).await
    }

    pub async fn update_item(&self, user_id: Uuid, product_id: Uuid, quantity: u32) -> Result<Cart> {
        self.users.set_cart_quantity(user_id, product_id, quantity).await
    }

    pub async fn remove_item(&self, user_id: Uuid, product_id: Uuid) -> Result<Cart> {
        self.users.remove_cart_item(user_id, product_id).await
    }

    pub async fn get_cart(&self, user_id: Uuid) -> Result<Vec<CartLine>> {
        let user = self.user(user_id).await?;
        let ids: Vec<Uuid> = user.cart.items().iter().map(|i| i.product_id).collect();
        let products = self.catalog.find_products(&ids).await?;
        Ok(user
            .cart
            .items()
            .iter()
            .map(|item| CartLine {
                product_id: item.product_id,
                quantity: item.quantity,
                product: products.iter().find(|p| p.id() == item.product_id).cloned(),
            })
            .collect())
    }

    async fn user(&self, user_id: Uuid) -> Result<User> {
        self.users.find_user(user_id).await?.ok_or_else(|| Error::not_found("User not found"))
    }
}
