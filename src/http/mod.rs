//! HTTP surface: router assembly and shared state.

mod auth;
mod cart;
mod categories;
mod checkout;
mod contact;
pub mod extract;
mod favorites;
mod paystack;
mod products;

use std::sync::Arc;

use axum::{routing::get, Json, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::error::{Error, Result};
use crate::integrations::PaymentProvider;
use crate::messaging::EventPublisher;
use crate::repository::Repositories;
use crate::services::{
    AuthService, CartService, CatalogService, ContactService, FavoritesService, StockReconciler, TokenSigner,
};

#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
    pub catalog: CatalogService,
    pub cart: CartService,
    pub favorites: FavoritesService,
    pub reconciler: StockReconciler,
    pub payments: Option<Arc<dyn PaymentProvider>>,
    pub contact: Option<ContactService>,
}

impl AppState {
    pub fn new(repos: Repositories, events: EventPublisher, tokens: TokenSigner) -> Self {
        Self {
            auth: AuthService::new(repos.users.clone(), tokens),
            catalog: CatalogService::new(repos.catalog.clone(), events.clone()),
            cart: CartService::new(repos.users.clone(), repos.catalog.clone()),
            favorites: FavoritesService::new(repos.users.clone(), repos.catalog.clone()),
            reconciler: StockReconciler::new(repos.catalog, repos.users, repos.payments, events),
            payments: None,
            contact: None,
        }
    }

    pub fn with_payments(mut self, provider: Arc<dyn PaymentProvider>) -> Self {
        self.payments = Some(provider);
        self
    }

    pub fn with_contact(mut self, contact: ContactService) -> Self {
        self.contact = Some(contact);
        self
    }

    fn payments(&self) -> Result<&dyn PaymentProvider> {
        self.payments
            .as_deref()
            .ok_or_else(|| Error::ExternalService("Payments are not configured".into()))
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "herhair-store"})) }))
        .nest("/api/auth", auth::routes())
        .nest("/api/products", products::routes())
        .nest("/api/categories", categories::routes())
        .nest("/api/cart", cart::routes())
        .nest("/api/favorites", favorites::routes())
        .nest("/api/checkout", checkout::routes())
        .nest("/api/paystack", paystack::routes())
        .merge(contact::routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
