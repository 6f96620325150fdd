//! HerHair storefront backend
//!
//! Hair and wig shop API: catalog, per-user carts and favorites, and the
//! stock reconciliation that runs once a payment is confirmed.
//!
//! ## Features
//! - Categories and products with derived stock status
//! - Carts and favorites embedded in the user account
//! - Paystack checkout with payment-driven stock decrements
//! - Contact form relay through Resend
//! - Domain events over NATS

pub mod config;
pub mod domain;
pub mod error;
pub mod http;
pub mod integrations;
pub mod messaging;
pub mod repository;
pub mod services;

pub use config::Config;
pub use error::{Error, Result};
pub use http::{router, AppState};
pub use repository::Repositories;
