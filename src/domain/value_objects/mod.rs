//! Value objects for the storefront catalog

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Below this many units a product is reported as low stock.
pub const LOW_STOCK_THRESHOLD: u32 = 5;

/// URL-safe category handle.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slug(String);

impl Slug {
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into().trim().to_string();
        if value.is_empty() { return Err(Error::validation("Slug is required")); }
        Ok(Self(value))
    }

    /// Lowercases the name and collapses each whitespace run into a hyphen.
    pub fn derive(name: &str) -> Result<Self> {
        Self::new(name.to_lowercase().split_whitespace().collect::<Vec<_>>().join("-"))
    }

    pub fn as_str(&self) -> &str { &self.0 }
    pub fn into_inner(self) -> String { self.0 }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

/// Stock status, always derived from a quantity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StockStatus {
    #[serde(rename = "in stock")]
    InStock,
    #[serde(rename = "low stock")]
    LowStock,
    #[serde(rename = "out of stock")]
    OutOfStock,
}

impl StockStatus {
    pub fn from_quantity(quantity: u32) -> Self {
        match quantity {
            0 => Self::OutOfStock,
            q if q < LOW_STOCK_THRESHOLD => Self::LowStock,
            _ => Self::InStock,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InStock => "in stock",
            Self::LowStock => "low stock",
            Self::OutOfStock => "out of stock",
        }
    }
}

impl FromStr for StockStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "in stock" => Ok(Self::InStock),
            "low stock" => Ok(Self::LowStock),
            "out of stock" => Ok(Self::OutOfStock),
            _ => Err(Error::validation("Invalid status")),
        }
    }
}

impl fmt::Display for StockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Stock quantity; subtraction is clamped at zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(u32);

impl Quantity {
    pub fn new(value: u32) -> Self { Self(value) }
    pub fn value(&self) -> u32 { self.0 }
    pub fn add(&self, other: u32) -> Self { Self(self.0.saturating_add(other)) }
    pub fn clamped_sub(&self, other: u32) -> Self { Self(self.0.saturating_sub(other)) }
    pub fn checked_sub(&self, other: u32) -> Option<Self> { self.0.checked_sub(other).map(Self) }
    pub fn is_zero(&self) -> bool { self.0 == 0 }
    pub fn status(&self) -> StockStatus { StockStatus::from_quantity(self.0) }
}

/// Product pricing: a positive list price and an optional lower sale price.
///
/// A sale price of zero means "no sale price" and is stored as `None`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pricing {
    price: Decimal,
    discounted_price: Option<Decimal>,
}

impl Pricing {
    pub fn new(price: Decimal, discounted_price: Option<Decimal>) -> Result<Self> {
        if price <= Decimal::ZERO { return Err(Error::validation("Price must be positive")); }
        let discounted_price = discounted_price.filter(|d| !d.is_zero());
        if let Some(discounted) = discounted_price {
            if discounted >= price {
                return Err(Error::validation("Discounted price must be less than price"));
            }
            if discounted < Decimal::ZERO {
                return Err(Error::validation("Discounted price cannot be negative"));
            }
        }
        Ok(Self { price, discounted_price })
    }

    pub fn price(&self) -> Decimal { self.price }
    pub fn discounted_price(&self) -> Option<Decimal> { self.discounted_price }

    /// What the customer actually pays per unit.
    pub fn effective(&self) -> Decimal { self.discounted_price.unwrap_or(self.price) }
}

/// Opaque variant metadata (length, color, texture), trimmed and case-folded.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Variant {
    pub length: Option<String>,
    pub color: Option<String>,
    pub texture: Option<String>,
}

impl Variant {
    pub fn new(length: Option<String>, color: Option<String>, texture: Option<String>) -> Self {
        Self { length: normalize(length), color: normalize(color), texture: normalize(texture) }
    }
}

fn normalize(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_lowercase()).filter(|v| !v.is_empty())
}
