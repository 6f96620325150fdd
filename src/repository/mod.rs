//! Persistence seam.
//!
//! Every method touches a single entity (one category, one product, one
//! user's cart) and is atomic with respect to it. Nothing here spans
//! entities; callers that chain several writes accept the gap in between.
//!
//! Stock and collection changes are expressed as deltas applied to the
//! stored row, never as a read-modify-write of a value the caller loaded.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::aggregates::{Cart, Category, Favorites, Product, User};
use crate::domain::value_objects::StockStatus;
use crate::error::Result;

#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Fails with `Conflict` when the name or slug is taken.
    async fn insert_category(&self, category: &Category) -> Result<()>;
    /// Fails with `Conflict` on a name/slug clash, `NotFound` when absent.
    async fn update_category(&self, category: &Category) -> Result<()>;
    async fn find_category(&self, id: Uuid) -> Result<Option<Category>>;
    /// Sorted by name.
    async fn list_categories(&self) -> Result<Vec<Category>>;
    /// Returns false when nothing was deleted.
    async fn delete_category(&self, id: Uuid) -> Result<bool>;

    async fn insert_product(&self, product: &Product) -> Result<()>;
    /// Writes the descriptive fields and returns the stored product. Quantity
    /// is only written when `set_quantity` is true; otherwise the stored
    /// quantity is kept. Fails with `NotFound` when absent.
    async fn update_product(&self, product: &Product, set_quantity: bool) -> Result<Product>;
    async fn find_product(&self, id: Uuid) -> Result<Option<Product>>;
    /// Missing ids are silently left out.
    async fn find_products(&self, ids: &[Uuid]) -> Result<Vec<Product>>;
    /// Newest first, optionally restricted to one stock status.
    async fn list_products(&self, status: Option<StockStatus>) -> Result<Vec<Product>>;
    async fn delete_product(&self, id: Uuid) -> Result<bool>;

    /// Sets `quantity = max(quantity - by, 0)` and re-derives status in one
    /// write. `None` when the product does not exist.
    async fn decrement_stock(&self, id: Uuid, by: u32) -> Result<Option<Product>>;
    /// `quantity = quantity - by` only when `quantity >= by`; fails with
    /// `Validation` otherwise. `None` when the product does not exist.
    async fn sell_stock(&self, id: Uuid, by: u32) -> Result<Option<Product>>;
    /// `quantity = quantity + by`. `None` when the product does not exist.
    async fn restock(&self, id: Uuid, by: u32) -> Result<Option<Product>>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `Conflict` when the email is taken.
    async fn insert_user(&self, user: &User) -> Result<()>;
    async fn find_user(&self, id: Uuid) -> Result<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;
    /// Adds `quantity` to the product's entry, creating it at the end of the
    /// cart if absent. All cart and favorites methods return the collection
    /// as stored after the write, and `NotFound` for an unknown user.
    async fn add_cart_item(&self, user_id: Uuid, product_id: Uuid, quantity: u32) -> Result<Cart>;
    /// `Validation` below 1, `NotFound` when the product is not in the cart.
    async fn set_cart_quantity(&self, user_id: Uuid, product_id: Uuid, quantity: u32) -> Result<Cart>;
    async fn remove_cart_item(&self, user_id: Uuid, product_id: Uuid) -> Result<Cart>;
    async fn clear_cart(&self, user_id: Uuid) -> Result<()>;
    async fn add_favorite(&self, user_id: Uuid, product_id: Uuid) -> Result<Favorites>;
    async fn remove_favorite(&self, user_id: Uuid, product_id: Uuid) -> Result<Favorites>;
}

/// Payment references that have already been turned into stock changes.
#[async_trait]
pub trait PaymentLedger: Send + Sync {
    /// Claims a reference. Returns false when it was already claimed.
    async fn claim(&self, reference: &str, user_id: Uuid) -> Result<bool>;
    /// Gives a claim back so the payment can be reconciled again.
    async fn release(&self, reference: &str) -> Result<()>;
}

/// The stores a running service is wired with, constructed once at startup.
#[derive(Clone)]
pub struct Repositories {
    pub catalog: Arc<dyn CatalogRepository>,
    pub users: Arc<dyn UserRepository>,
    pub payments: Arc<dyn PaymentLedger>,
}

impl Repositories {
    pub fn memory() -> Self {
        let store = Arc::new(MemoryStore::default());
        Self { catalog: store.clone(), users: store.clone(), payments: store }
    }

    pub fn postgres(pool: sqlx::PgPool) -> Self {
        let store = Arc::new(PgStore::new(pool));
        Self { catalog: store.clone(), users: store.clone(), payments: store }
    }
}
