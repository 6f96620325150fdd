//! Aggregates module
pub mod product;
pub mod category;
pub mod cart;
pub mod favorites;
pub mod user;

pub use product::{NewProduct, Product, ProductPatch, ProductRecord};
pub use category::{Category, CategoryPatch};
pub use cart::{Cart, CartItem};
pub use favorites::Favorites;
pub use user::User;
