//! User Aggregate

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::{Cart, Favorites};
use crate::error::{Error, Result};

/// An account plus its embedded cart and favorites.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    pub is_admin: bool,
    #[serde(skip)]
    pub cart: Cart,
    #[serde(skip)]
    pub favorites: Favorites,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn register(name: &str, email: &str, password_hash: String, is_admin: bool) -> Result<Self> {
        let name = name.trim();
        let email = normalize_email(email);
        if name.is_empty() || email.is_empty() {
            return Err(Error::validation("Please provide all required fields"));
        }
        Ok(Self {
            id: Uuid::now_v7(), name: name.to_string(), email, password_hash, is_admin,
            cart: Cart::default(), favorites: Favorites::default(), created_at: Utc::now(),
        })
    }
}

pub fn normalize_email(email: &str) -> String { email.trim().to_lowercase() }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_normalizes_email() {
        let u = User::register("Ada", "  Ada@Example.COM ", "hash".into(), false).unwrap();
        assert_eq!(u.email, "ada@example.com");
        assert!(u.cart.is_empty());
        let json = serde_json::to_value(&u).unwrap();
        assert!(json.get("passwordHash").is_none());
    }

    #[test]
    fn test_register_requires_fields() {
        assert!(matches!(User::register("", "a@b.c", "h".into(), false), Err(Error::Validation(_))));
    }
}
