//! Favorites Aggregate

use serde::Serialize;
use uuid::Uuid;

/// Ordered set of favorited products.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Favorites {
    products: Vec<Uuid>,
}

impl Favorites {
    pub fn from_products(products: impl IntoIterator<Item = Uuid>) -> Self {
        let mut favorites = Self::default();
        for p in products { favorites.add(p); }
        favorites
    }

    pub fn products(&self) -> &[Uuid] { &self.products }
    pub fn contains(&self, product_id: Uuid) -> bool { self.products.contains(&product_id) }
    pub fn len(&self) -> usize { self.products.len() }
    pub fn is_empty(&self) -> bool { self.products.is_empty() }

    pub fn add(&mut self, product_id: Uuid) {
        if !self.contains(product_id) { self.products.push(product_id); }
    }

    pub fn remove(&mut self, product_id: Uuid) {
        self.products.retain(|p| *p != product_id);
    }
}
