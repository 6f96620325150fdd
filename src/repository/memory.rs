//! In-process store used when no database is configured, and by tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{CatalogRepository, PaymentLedger, UserRepository};
use crate::domain::aggregates::{Cart, Category, Favorites, Product, User};
use crate::domain::value_objects::StockStatus;
use crate::error::{Error, Result};

#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

#[derive(Default)]
struct State {
    categories: HashMap<Uuid, Category>,
    products: HashMap<Uuid, Product>,
    users: HashMap<Uuid, User>,
    payments: HashMap<String, Uuid>,
}

impl State {
    fn check_category_unique(&self, category: &Category) -> Result<()> {
        if self.categories.values().any(|c| c.clashes_with(category)) {
            return Err(Error::conflict("Category already exists"));
        }
        Ok(())
    }

    fn user_mut(&mut self, id: Uuid) -> Result<&mut User> {
        self.users.get_mut(&id).ok_or_else(|| Error::not_found("User not found"))
    }
}

#[async_trait]
impl CatalogRepository for MemoryStore {
    async fn insert_category(&self, category: &Category) -> Result<()> {
        let mut state = self.state.write().await;
        state.check_category_unique(category)?;
        state.categories.insert(category.id, category.clone());
        Ok(())
    }

    async fn update_category(&self, category: &Category) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.categories.contains_key(&category.id) {
            return Err(Error::not_found("Category not found"));
        }
        state.check_category_unique(category)?;
        state.categories.insert(category.id, category.clone());
        Ok(())
    }

    async fn find_category(&self, id: Uuid) -> Result<Option<Category>> {
        Ok(self.state.read().await.categories.get(&id).cloned())
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        let mut categories: Vec<Category> = self.state.read().await.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn delete_category(&self, id: Uuid) -> Result<bool> {
        Ok(self.state.write().await.categories.remove(&id).is_some())
    }

    async fn insert_product(&self, product: &Product) -> Result<()> {
        let mut product = product.clone();
        product.take_events();
        self.state.write().await.products.insert(product.id(), product);
        Ok(())
    }

    async fn update_product(&self, product: &Product, set_quantity: bool) -> Result<Product> {
        let mut state = self.state.write().await;
        let slot = state.products.get_mut(&product.id()).ok_or_else(|| Error::not_found("Product not found"))?;
        let mut next = product.clone();
        next.take_events();
        if !set_quantity { next.keep_stock_of(slot); }
        *slot = next;
        Ok(slot.clone())
    }

    async fn find_product(&self, id: Uuid) -> Result<Option<Product>> {
        Ok(self.state.read().await.products.get(&id).cloned())
    }

    async fn find_products(&self, ids: &[Uuid]) -> Result<Vec<Product>> {
        let state = self.state.read().await;
        Ok(ids.iter().filter_map(|id| state.products.get(id).cloned()).collect())
    }

    async fn list_products(&self, status: Option<StockStatus>) -> Result<Vec<Product>> {
        let state = self.state.read().await;
        let mut products: Vec<Product> = state
            .products
            .values()
            .filter(|p| status.map_or(true, |s| p.status() == s))
            .cloned()
            .collect();
        products.sort_by(|a, b| b.created_at().cmp(&a.created_at()).then(b.id().cmp(&a.id())));
        Ok(products)
    }

    async fn delete_product(&self, id: Uuid) -> Result<bool> {
        Ok(self.state.write().await.products.remove(&id).is_some())
    }

    async fn decrement_stock(&self, id: Uuid, by: u32) -> Result<Option<Product>> {
        let mut state = self.state.write().await;
        Ok(state.products.get_mut(&id).map(|product| {
            product.decrement_clamped(by);
            product.take_events();
            product.clone()
        }))
    }

    async fn sell_stock(&self, id: Uuid, by: u32) -> Result<Option<Product>> {
        let mut state = self.state.write().await;
        let Some(product) = state.products.get_mut(&id) else { return Ok(None) };
        product.sell(by)?;
        product.take_events();
        Ok(Some(product.clone()))
    }

    async fn restock(&self, id: Uuid, by: u32) -> Result<Option<Product>> {
        let mut state = self.state.write().await;
        Ok(state.products.get_mut(&id).map(|product| {
            product.restock(by);
            product.take_events();
            product.clone()
        }))
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn insert_user(&self, user: &User) -> Result<()> {
        let mut state = self.state.write().await;
        if state.users.values().any(|u| u.email == user.email) {
            return Err(Error::conflict("User already exists"));
        }
        state.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self.state.read().await.users.values().find(|u| u.email == email).cloned())
    }

    async fn add_cart_item(&self, user_id: Uuid, product_id: Uuid, quantity: u32) -> Result<Cart> {
        let mut state = self.state.write().await;
        let cart = &mut state.user_mut(user_id)?.cart;
        cart.add_item(product_id, quantity);
        Ok(cart.clone())
    }

    async fn set_cart_quantity(&self, user_id: Uuid, product_id: Uuid, quantity: u32) -> Result<Cart> {
        let mut state = self.state.write().await;
        let cart = &mut state.user_mut(user_id)?.cart;
        cart.update_quantity(product_id, quantity)?;
        Ok(cart.clone())
    }

    async fn remove_cart_item(&self, user_id: Uuid, product_id: Uuid) -> Result<Cart> {
        let mut state = self.state.write().await;
        let cart = &mut state.user_mut(user_id)?.cart;
        cart.remove_item(product_id);
        Ok(cart.clone())
    }

    async fn clear_cart(&self, user_id: Uuid) -> Result<()> {
        self.state.write().await.user_mut(user_id)?.cart.clear();
        Ok(())
    }

    async fn add_favorite(&self, user_id: Uuid, product_id: Uuid) -> Result<Favorites> {
        let mut state = self.state.write().await;
        let favorites = &mut state.user_mut(user_id)?.favorites;
        favorites.add(product_id);
        Ok(favorites.clone())
    }

    async fn remove_favorite(&self, user_id: Uuid, product_id: Uuid) -> Result<Favorites> {
        let mut state = self.state.write().await;
        let favorites = &mut state.user_mut(user_id)?.favorites;
        favorites.remove(product_id);
        Ok(favorites.clone())
    }
}

#[async_trait]
impl PaymentLedger for MemoryStore {
    async fn claim(&self, reference: &str, user_id: Uuid) -> Result<bool> {
        let mut state = self.state.write().await;
        if state.payments.contains_key(reference) {
            return Ok(false);
        }
        state.payments.insert(reference.to_string(), user_id);
        Ok(true)
    }

    async fn release(&self, reference: &str) -> Result<()> {
        self.state.write().await.payments.remove(reference);
        Ok(())
    }
}
