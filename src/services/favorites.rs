//! Per-user favorites.

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::domain::aggregates::{Favorites, Product, User};
use crate::error::{Error, Result};
use crate::repository::{CatalogRepository, UserRepository};

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteEntry {
    pub product_id: Uuid,
    pub product: Option<Product>,
}

#[derive(Clone)]
pub struct FavoritesService {
    users: Arc<dyn UserRepository>,
    catalog: Arc<dyn CatalogRepository>,
}

impl FavoritesService {
    pub fn new(users: Arc<dyn UserRepository>, catalog: Arc<dyn CatalogRepository>) -> Self {
        Self { users, catalog }
    }

    /// Only a product that is not yet a favorite has to exist.
    pub async fn add_favorite(&self, user_id: Uuid, product_id: Uuid) -> Result<Favorites> {
        let user = self.user(user_id).await?;
        if !user.favorites.contains(product_id) && self.catalog.find_product(product_id).await?.is_none() {
            return Err(Error::not_found("Product not found"));
        }
        self.users.add_favorite(user_id, product_id).await
    }

    pub async fn remove_favorite(&self, user_id: Uuid, product_id: Uuid) -> Result<Favorites> {
        self.users.remove_favorite(user_id, product_id).await
    }

    pub async fn get_favorites(&self, user_id: Uuid) -> Result<Vec<FavoriteEntry>> {
        let user = self.user(user_id).await?;
        let products = self.catalog.find_products(user.favorites.products()).await?;
        Ok(user
            .favorites
            .products()
            .iter()
            .map(|id| FavoriteEntry { product_id: *id, product: products.iter().find(|p| p.id() == *id).cloned() })
            .collect())
    }

    async fn user(&self, user_id: Uuid) -> Result<User> {
        self.users.find_user(user_id).await?.ok_or_else(|| Error::not_found("User not found"))
    }
}
