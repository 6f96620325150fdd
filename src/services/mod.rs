//! Application services: each one owns a use case and talks to storage
//! through the repository traits.
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod contact;
pub mod favorites;
pub mod reconciliation;

pub use auth::{AuthService, AuthSession, Credentials, TokenSigner};
pub use cart::{CartLine, CartService};
pub use catalog::{CatalogService, CategorySummary, NewCategory, ProductView};
pub use contact::{ContactMessage, ContactService};
pub use favorites::{FavoriteEntry, FavoritesService};
pub use reconciliation::{PaymentOutcome, ReconciliationReport, StockReconciler};
