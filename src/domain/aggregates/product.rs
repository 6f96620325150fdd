//! Product Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::events::{DomainEvent, ProductEvent};
use crate::domain::value_objects::{Pricing, Quantity, StockStatus, Variant};
use crate::error::{Error, Result};

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    id: Uuid,
    name: String,
    #[serde(flatten)]
    pricing: Pricing,
    images: Vec<String>,
    description: String,
    #[serde(flatten)]
    variant: Variant,
    category: Uuid,
    quantity: Quantity,
    status: StockStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

/// Fields accepted when creating a product.
#[derive(Clone, Debug, Default)]
pub struct NewProduct {
    pub name: String,
    pub price: Decimal,
    pub discounted_price: Option<Decimal>,
    pub images: Vec<String>,
    pub description: Option<String>,
    pub length: Option<String>,
    pub color: Option<String>,
    pub texture: Option<String>,
    pub category: Uuid,
    pub quantity: u32,
}

/// Partial update; `None` leaves a field untouched.
#[derive(Clone, Debug, Default)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub price: Option<Decimal>,
    /// `Some(None)` clears the discount.
    pub discounted_price: Option<Option<Decimal>>,
    /// An empty list keeps the current images.
    pub images: Option<Vec<String>>,
    pub description: Option<String>,
    pub length: Option<String>,
    pub color: Option<String>,
    pub texture: Option<String>,
    pub category: Option<Uuid>,
    pub quantity: Option<u32>,
}

/// Persisted shape of a product; status is not part of it.
#[derive(Clone, Debug)]
pub struct ProductRecord {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub discounted_price: Option<Decimal>,
    pub images: Vec<String>,
    pub description: String,
    pub length: Option<String>,
    pub color: Option<String>,
    pub texture: Option<String>,
    pub category: Uuid,
    pub quantity: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn create(input: NewProduct) -> Result<Self> {
        let name = required_name(&input.name)?;
        let pricing = Pricing::new(input.price, input.discounted_price)?;
        let now = Utc::now();
        let quantity = Quantity::new(input.quantity);
        let mut product = Self {
            id: Uuid::now_v7(), name, pricing,
            images: clean_images(input.images),
            description: input.description.map(|d| d.trim().to_string()).unwrap_or_default(),
            variant: Variant::new(input.length, input.color, input.texture),
            category: input.category, quantity, status: quantity.status(),
            created_at: now, updated_at: now, events: vec![],
        };
        product.raise_event(DomainEvent::Product(ProductEvent::Created { product_id: product.id, name: product.name.clone() }));
        Ok(product)
    }

    /// Rebuilds a product from storage, re-deriving status from quantity.
    pub fn from_record(r: ProductRecord) -> Result<Self> {
        let quantity = Quantity::new(r.quantity);
        Ok(Self {
            id: r.id, name: r.name,
            pricing: Pricing::new(r.price, r.discounted_price)?,
            images: r.images, description: r.description,
            variant: Variant::new(r.length, r.color, r.texture),
            category: r.category, quantity, status: quantity.status(),
            created_at: r.created_at, updated_at: r.updated_at, events: vec![],
        })
    }

    pub fn to_record(&self) -> ProductRecord {
        ProductRecord {
            id: self.id, name: self.name.clone(),
            price: self.pricing.price(), discounted_price: self.pricing.discounted_price(),
            images: self.images.clone(), description: self.description.clone(),
            length: self.variant.length.clone(), color: self.variant.color.clone(), texture: self.variant.texture.clone(),
            category: self.category, quantity: self.quantity.value(),
            created_at: self.created_at, updated_at: self.updated_at,
        }
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn name(&self) -> &str { &self.name }
    pub fn pricing(&self) -> &Pricing { &self.pricing }
    pub fn images(&self) -> &[String] { &self.images }
    pub fn description(&self) -> &str { &self.description }
    pub fn variant(&self) -> &Variant { &self.variant }
    pub fn category(&self) -> Uuid { self.category }
    pub fn quantity(&self) -> u32 { self.quantity.value() }
    pub fn status(&self) -> StockStatus { self.status }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }

    /// Merges the provided fields and re-validates pricing as a whole.
    pub fn apply(&mut self, patch: ProductPatch) -> Result<()> {
        let price = patch.price.unwrap_or(self.pricing.price());
        let discounted = match patch.discounted_price {
            Some(d) => d,
            None => self.pricing.discounted_price(),
        };
        let pricing = Pricing::new(price, discounted)?;
        let name = match patch.name {
            Some(n) => required_name(&n)?,
            None => self.name.clone(),
        };

        self.name = name;
        self.pricing = pricing;
        if let Some(images) = patch.images.map(clean_images).filter(|i| !i.is_empty()) {
            self.images = images;
        }
        if let Some(description) = patch.description { self.description = description.trim().to_string(); }
        if patch.length.is_some() || patch.color.is_some() || patch.texture.is_some() {
            self.variant = Variant::new(
                patch.length.or_else(|| self.variant.length.clone()),
                patch.color.or_else(|| self.variant.color.clone()),
                patch.texture.or_else(|| self.variant.texture.clone()),
            );
        }
        if let Some(category) = patch.category { self.category = category; }
        match patch.quantity {
            Some(q) => self.set_quantity(q),
            None => self.touch(),
        }
        Ok(())
    }

    pub fn set_quantity(&mut self, quantity: u32) {
        self.quantity = Quantity::new(quantity);
        self.status = self.quantity.status();
        self.touch();
        self.raise_event(DomainEvent::Product(ProductEvent::StockAdjusted {
            product_id: self.id, quantity: self.quantity.value(), status: self.status,
        }));
    }

    /// Adopts the stored quantity (and status) of `stored`, leaving every
    /// other field as edited. Raises no event.
    pub fn keep_stock_of(&mut self, stored: &Product) {
        self.quantity = stored.quantity;
        self.status = stored.status;
    }

    pub fn restock(&mut self, amount: u32) {
        self.set_quantity(self.quantity.add(amount).value());
    }

    /// Strict decrement: refuses to sell more than is on hand.
    pub fn sell(&mut self, amount: u32) -> Result<()> {
        let remaining = self.quantity.checked_sub(amount).ok_or_else(|| Error::validation("Not enough stock"))?;
        self.set_quantity(remaining.value());
        Ok(())
    }

    /// Best-effort decrement, floored at zero.
    pub fn decrement_clamped(&mut self, amount: u32) {
        self.set_quantity(self.quantity.clamped_sub(amount).value());
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

fn required_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() { return Err(Error::validation("Product name is required")); }
    Ok(name.to_string())
}

fn clean_images(images: Vec<String>) -> Vec<String> {
    images.into_iter().map(|i| i.trim().to_string()).filter(|i| !i.is_empty()).collect()
}
