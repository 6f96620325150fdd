//! Categories and products.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::aggregates::{Category, CategoryPatch, NewProduct, Product, ProductPatch};
use crate::domain::events::{DomainEvent, ProductEvent};
use crate::domain::value_objects::{Pricing, Slug, StockStatus, Variant};
use crate::error::{Error, Result};
use crate::messaging::EventPublisher;
use crate::repository::CatalogRepository;

#[derive(Clone, Debug, Default)]
pub struct NewCategory {
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CategorySummary {
    pub id: Uuid,
    pub name: String,
    pub slug: Slug,
}

impl From<&Category> for CategorySummary {
    fn from(c: &Category) -> Self {
        Self { id: c.id, name: c.name.clone(), slug: c.slug.clone() }
    }
}

/// A product as the storefront reads it, with its category resolved.
///
/// `category` is `None` when the referenced category has been deleted.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    pub id: Uuid,
    pub name: String,
    #[serde(flatten)]
    pub pricing: Pricing,
    pub images: Vec<String>,
    pub description: String,
    #[serde(flatten)]
    pub variant: Variant,
    pub category: Option<CategorySummary>,
    pub quantity: u32,
    pub status: StockStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductView {
    pub fn new(product: &Product, category: Option<CategorySummary>) -> Self {
        Self {
            id: product.id(), name: product.name().to_string(), pricing: product.pricing().clone(),
            images: product.images().to_vec(), description: product.description().to_string(),
            variant: product.variant().clone(), category,
            quantity: product.quantity(), status: product.status(),
            created_at: product.created_at(), updated_at: product.updated_at(),
        }
    }
}

#[derive(Clone)]
pub struct CatalogService {
    repo: Arc<dyn CatalogRepository>,
    events: EventPublisher,
}

impl CatalogService {
    pub fn new(repo: Arc<dyn CatalogRepository>, events: EventPublisher) -> Self {
        Self { repo, events }
    }

    pub async fn create_category(&self, input: NewCategory) -> Result<Category> {
        let category = Category::create(&input.name, input.slug.as_deref(), input.description)?;
        self.repo.insert_category(&category).await?;
        tracing::info!(category_id = %category.id, slug = %category.slug, "category created");
        Ok(category)
    }

    pub async fn get_category(&self, id: Uuid) -> Result<Category> {
        self.repo.find_category(id).await?.ok_or_else(|| Error::not_found("Category not found"))
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        self.repo.list_categories().await
    }

    pub async fn update_category(&self, id: Uuid, patch: CategoryPatch) -> Result<Category> {
        let mut category = self.get_category(id).await?;
        category.apply(patch)?;
        self.repo.update_category(&category).await?;
        Ok(category)
    }

    /// Products referencing the category keep their (now dangling) reference.
    pub async fn delete_category(&self, id: Uuid) -> Result<()> {
        if !self.repo.delete_category(id).await? {
            return Err(Error::not_found("Category not found"));
        }
        tracing::info!(category_id = %id, "category deleted");
        Ok(())
    }

    pub async fn create_product(&self, input: NewProduct) -> Result<Product> {
        self.ensure_category(input.category).await?;
        let mut product = Product::create(input)?;
        self.repo.insert_product(&product).await?;
        tracing::info!(product_id = %product.id(), quantity = product.quantity(), "product created");
        self.events.publish(product.take_events()).await;
        Ok(product)
    }

    pub async fn get_product(&self, id: Uuid) -> Result<Product> {
        self.repo.find_product(id).await?.ok_or_else(|| Error::not_found("Product not found"))
    }

    pub async fn list_products(&self, status: Option<StockStatus>) -> Result<Vec<Product>> {
        self.repo.list_products(status).await
    }

    pub async fn get_product_view(&self, id: Uuid) -> Result<ProductView> {
        let product = self.get_product(id).await?;
        let category = self.repo.find_category(product.category()).await?;
        Ok(ProductView::new(&product, category.as_ref().map(CategorySummary::from)))
    }

    pub async fn list_product_views(&self, status: Option<StockStatus>) -> Result<Vec<ProductView>> {
        let products = self.repo.list_products(status).await?;
        let categories: HashMap<Uuid, CategorySummary> = self
            .repo
            .list_categories()
            .await?
            .iter()
            .map(|c| (c.id, CategorySummary::from(c)))
            .collect();
        Ok(products.iter().map(|p| ProductView::new(p, categories.get(&p.category()).cloned())).collect())
    }

    /// Quantity is only written when the patch sets it; otherwise concurrent
    /// stock changes made since the read are kept.
    pub async fn update_product(&self, id: Uuid, patch: ProductPatch) -> Result<Product> {
        let mut product = self.get_product(id).await?;
        if let Some(category) = patch.category.filter(|c| *c != product.category()) {
            self.ensure_category(category).await?;
        }
        let set_quantity = patch.quantity.is_some();
        product.apply(patch)?;
        let events = product.take_events();
        let stored = self.repo.update_product(&product, set_quantity).await?;
        self.events.publish(events).await;
        Ok(stored)
    }

    pub async fn delete_product(&self, id: Uuid) -> Result<Product> {
        let product = self.get_product(id).await?;
        if !self.repo.delete_product(id).await? {
            return Err(Error::not_found("Product not found"));
        }
        tracing::info!(product_id = %id, "product deleted");
        self.events.publish(vec![DomainEvent::Product(ProductEvent::Deleted { product_id: id })]).await;
        Ok(product)
    }

    /// Strict decrement used for manual sales; never oversells.
    pub async fn sell_product(&self, id: Uuid, amount: u32) -> Result<Product> {
        let product = self.repo.sell_stock(id, amount).await?.ok_or_else(|| Error::not_found("Product not found"))?;
        self.stock_adjusted(&product).await;
        Ok(product)
    }

    pub async fn restock_product(&self, id: Uuid, amount: u32) -> Result<Product> {
        let product = self.repo.restock(id, amount).await?.ok_or_else(|| Error::not_found("Product not found"))?;
        self.stock_adjusted(&product).await;
        Ok(product)
    }

    async fn stock_adjusted(&self, product: &Product) {
        tracing::debug!(product_id = %product.id(), quantity = product.quantity(), "stock adjusted");
        self.events
            .publish(vec![DomainEvent::Product(ProductEvent::StockAdjusted {
                product_id: product.id(), quantity: product.quantity(), status: product.status(),
            })])
            .await;
    }

    async fn ensure_category(&self, id: Uuid) -> Result<()> {
        match self.repo.find_category(id).await? {
            Some(_) => Ok(()),
            None => Err(Error::validation("Category does not exist")),
        }
    }
}
