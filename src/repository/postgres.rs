//! Postgres-backed store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use super::{CatalogRepository, PaymentLedger, UserRepository};
use crate::domain::aggregates::{Cart, CartItem, Category, Favorites, Product, ProductRecord, User};
use crate::domain::value_objects::{Slug, StockStatus};
use crate::error::{Error, Result};

const PRODUCT_COLUMNS: &str = "id, name, price, discounted_price, images, description, length, color, texture, category_id, quantity, created_at, updated_at";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self { Self { pool } }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct CategoryRow { id: Uuid, name: String, slug: String, description: String, created_at: DateTime<Utc>, updated_at: DateTime<Utc> }

impl TryFrom<CategoryRow> for Category {
    type Error = Error;
    fn try_from(r: CategoryRow) -> Result<Self> {
        Ok(Self { id: r.id, name: r.name, slug: Slug::new(r.slug)?, description: r.description, created_at: r.created_at, updated_at: r.updated_at })
    }
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: Uuid, name: String, price: Decimal, discounted_price: Option<Decimal>, images: Vec<String>,
    description: String, length: Option<String>, color: Option<String>, texture: Option<String>,
    category_id: Uuid, quantity: i32, created_at: DateTime<Utc>, updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = Error;
    fn try_from(r: ProductRow) -> Result<Self> {
        let quantity = u32::try_from(r.quantity).map_err(|_| Error::Storage(format!("negative stock on product {}", r.id)))?;
        Product::from_record(ProductRecord {
            id: r.id, name: r.name, price: r.price, discounted_price: r.discounted_price, images: r.images,
            description: r.description, length: r.length, color: r.color, texture: r.texture,
            category: r.category_id, quantity, created_at: r.created_at, updated_at: r.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct UserRow { id: Uuid, name: String, email: String, password_hash: String, is_admin: bool, created_at: DateTime<Utc> }

fn to_i32(value: u32) -> Result<i32> {
    i32::try_from(value).map_err(|_| Error::validation("Quantity is too large"))
}

fn category_conflict(err: sqlx::Error) -> Error {
    match Error::from(err) {
        Error::Conflict(_) => Error::conflict("Category already exists"),
        other => other,
    }
}

async fn cart_of<'e>(db: impl sqlx::PgExecutor<'e>, user_id: Uuid) -> Result<Cart> {
    let rows: Vec<(Uuid, i32)> = sqlx::query_as("SELECT product_id, quantity FROM cart_items WHERE user_id = $1 ORDER BY position")
        .bind(user_id).fetch_all(db).await?;
    Ok(Cart::from_items(
        rows.into_iter()
            .map(|(product_id, quantity)| CartItem { product_id, quantity: u32::try_from(quantity).unwrap_or(1) })
            .collect(),
    ))
}

async fn favorites_of<'e>(db: impl sqlx::PgExecutor<'e>, user_id: Uuid) -> Result<Favorites> {
    let rows: Vec<(Uuid,)> = sqlx::query_as("SELECT product_id FROM favorites WHERE user_id = $1 ORDER BY position")
        .bind(user_id).fetch_all(db).await?;
    Ok(Favorites::from_products(rows.into_iter().map(|(p,)| p)))
}

impl PgStore {
    async fn load_user(&self, row: UserRow) -> Result<User> {
        Ok(User {
            cart: cart_of(&self.pool, row.id).await?,
            favorites: favorites_of(&self.pool, row.id).await?,
            id: row.id, name: row.name, email: row.email, password_hash: row.password_hash, is_admin: row.is_admin,
            created_at: row.created_at,
        })
    }

    async fn ensure_user(&self, tx: &mut sqlx::Transaction<'_, sqlx::Postgres>, user_id: Uuid) -> Result<()> {
        // Row lock serializes concurrent writes to the same user's collections.
        sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(user_id).fetch_optional(&mut **tx).await?
            .ok_or_else(|| Error::not_found("User not found"))?;
        Ok(())
    }

    async fn product_exists(&self, id: Uuid) -> Result<bool> {
        let (exists,): (bool,) = sqlx::query_as("SELECT EXISTS (SELECT 1 FROM products WHERE id = $1)")
            .bind(id).fetch_one(&self.pool).await?;
        Ok(exists)
    }
}

#[async_trait]
impl CatalogRepository for PgStore {
    async fn insert_category(&self, c: &Category) -> Result<()> {
        sqlx::query("INSERT INTO categories (id, name, slug, description, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6)")
            .bind(c.id).bind(&c.name).bind(c.slug.as_str()).bind(&c.description).bind(c.created_at).bind(c.updated_at)
            .execute(&self.pool).await.map_err(category_conflict)?;
        Ok(())
    }

    async fn update_category(&self, c: &Category) -> Result<()> {
        let result = sqlx::query("UPDATE categories SET name = $2, slug = $3, description = $4, updated_at = $5 WHERE id = $1")
            .bind(c.id).bind(&c.name).bind(c.slug.as_str()).bind(&c.description).bind(c.updated_at)
            .execute(&self.pool).await.map_err(category_conflict)?;
        if result.rows_affected() == 0 { return Err(Error::not_found("Category not found")); }
        Ok(())
    }

    async fn find_category(&self, id: Uuid) -> Result<Option<Category>> {
        sqlx::query_as::<_, CategoryRow>("SELECT * FROM categories WHERE id = $1")
            .bind(id).fetch_optional(&self.pool).await?
            .map(Category::try_from).transpose()
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        sqlx::query_as::<_, CategoryRow>("SELECT * FROM categories ORDER BY name")
            .fetch_all(&self.pool).await?
            .into_iter().map(Category::try_from).collect()
    }

    async fn delete_category(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1").bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_product(&self, p: &Product) -> Result<()> {
        let r = p.to_record();
        sqlx::query(&format!("INSERT INTO products ({PRODUCT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)"))
            .bind(r.id).bind(&r.name).bind(r.price).bind(r.discounted_price).bind(&r.images).bind(&r.description)
            .bind(&r.length).bind(&r.color).bind(&r.texture).bind(r.category).bind(to_i32(r.quantity)?)
            .bind(r.created_at).bind(r.updated_at)
            .execute(&self.pool).await?;
        Ok(())
    }

    async fn update_product(&self, p: &Product, set_quantity: bool) -> Result<Product> {
        let r = p.to_record();
        sqlx::query_as::<_, ProductRow>(&format!(
            "UPDATE products SET name = $2, price = $3, discounted_price = $4, images = $5, description = $6, \
             length = $7, color = $8, texture = $9, category_id = $10, \
             quantity = CASE WHEN $13 THEN $11 ELSE quantity END, updated_at = $12 \
             WHERE id = $1 RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(r.id).bind(&r.name).bind(r.price).bind(r.discounted_price).bind(&r.images).bind(&r.description)
        .bind(&r.length).bind(&r.color).bind(&r.texture).bind(r.category).bind(to_i32(r.quantity)?).bind(r.updated_at)
        .bind(set_quantity)
        .fetch_optional(&self.pool).await?
        .map(Product::try_from).transpose()?
        .ok_or_else(|| Error::not_found("Product not found"))
    }

    async fn find_product(&self, id: Uuid) -> Result<Option<Product>> {
        sqlx::query_as::<_, ProductRow>(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
            .bind(id).fetch_optional(&self.pool).await?
            .map(Product::try_from).transpose()
    }

    async fn find_products(&self, ids: &[Uuid]) -> Result<Vec<Product>> {
        let mut products: Vec<Product> = sqlx::query_as::<_, ProductRow>(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1)"))
            .bind(ids).fetch_all(&self.pool).await?
            .into_iter().map(Product::try_from).collect::<Result<_>>()?;
        products.sort_by_key(|p| ids.iter().position(|id| *id == p.id()));
        Ok(products)
    }

    async fn list_products(&self, status: Option<StockStatus>) -> Result<Vec<Product>> {
        let rows = match status {
            Some(s) => sqlx::query_as::<_, ProductRow>(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE status = $1 ORDER BY created_at DESC, id DESC"))
                .bind(s.as_str()).fetch_all(&self.pool).await?,
            None => sqlx::query_as::<_, ProductRow>(&format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY created_at DESC, id DESC"))
                .fetch_all(&self.pool).await?,
        };
        rows.into_iter().map(Product::try_from).collect()
    }

    async fn delete_product(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1").bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn decrement_stock(&self, id: Uuid, by: u32) -> Result<Option<Product>> {
        sqlx::query_as::<_, ProductRow>(&format!(
            "UPDATE products SET quantity = GREATEST(quantity - $2, 0), updated_at = NOW() WHERE id = $1 RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id).bind(i64::from(by))
        .fetch_optional(&self.pool).await?
        .map(Product::try_from).transpose()
    }

    async fn sell_stock(&self, id: Uuid, by: u32) -> Result<Option<Product>> {
        let sold = sqlx::query_as::<_, ProductRow>(&format!(
            "UPDATE products SET quantity = quantity - $2, updated_at = NOW() WHERE id = $1 AND quantity >= $2 RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id).bind(i64::from(by))
        .fetch_optional(&self.pool).await?;
        match sold {
            Some(row) => Product::try_from(row).map(Some),
            None if self.product_exists(id).await? => Err(Error::validation("Not enough stock")),
            None => Ok(None),
        }
    }

    async fn restock(&self, id: Uuid, by: u32) -> Result<Option<Product>> {
        sqlx::query_as::<_, ProductRow>(&format!(
            "UPDATE products SET quantity = quantity + $2, updated_at = NOW() WHERE id = $1 RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id).bind(to_i32(by)?)
        .fetch_optional(&self.pool).await?
        .map(Product::try_from).transpose()
    }
}

#[async_trait]
impl UserRepository for PgStore {
    async fn insert_user(&self, u: &User) -> Result<()> {
        sqlx::query("INSERT INTO users (id, name, email, password_hash, is_admin, created_at) VALUES ($1, $2, $3, $4, $5, $6)")
            .bind(u.id).bind(&u.name).bind(&u.email).bind(&u.password_hash).bind(u.is_admin).bind(u.created_at)
            .execute(&self.pool).await
            .map_err(|e| match Error::from(e) {
                Error::Conflict(_) => Error::conflict("User already exists"),
                other => other,
            })?;
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1").bind(id).fetch_optional(&self.pool).await?;
        match row {
            Some(row) => Ok(Some(self.load_user(row).await?)),
            None => Ok(None),
        }
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = $1").bind(email).fetch_optional(&self.pool).await?;
        match row {
            Some(row) => Ok(Some(self.load_user(row).await?)),
            None => Ok(None),
        }
    }

    async fn add_cart_item(&self, user_id: Uuid, product_id: Uuid, quantity: u32) -> Result<Cart> {
        let mut tx = self.pool.begin().await?;
        self.ensure_user(&mut tx, user_id).await?;
        sqlx::query(
            "INSERT INTO cart_items (user_id, product_id, quantity, position) \
             VALUES ($1, $2, $3, (SELECT COALESCE(MAX(position) + 1, 0) FROM cart_items WHERE user_id = $1)) \
             ON CONFLICT (user_id, product_id) DO UPDATE \
             SET quantity = LEAST(cart_items.quantity::bigint + EXCLUDED.quantity, 2147483647)::int",
        )
        .bind(user_id).bind(product_id).bind(to_i32(quantity)?)
        .execute(&mut *tx).await?;
        let cart = cart_of(&mut *tx, user_id).await?;
        tx.commit().await?;
        Ok(cart)
    }

    async fn set_cart_quantity(&self, user_id: Uuid, product_id: Uuid, quantity: u32) -> Result<Cart> {
        if quantity < 1 { return Err(Error::validation("Quantity must be at least 1")); }
        let mut tx = self.pool.begin().await?;
        self.ensure_user(&mut tx, user_id).await?;
        let result = sqlx::query("UPDATE cart_items SET quantity = $3 WHERE user_id = $1 AND product_id = $2")
            .bind(user_id).bind(product_id).bind(to_i32(quantity)?)
            .execute(&mut *tx).await?;
        if result.rows_affected() == 0 { return Err(Error::not_found("Product not in cart")); }
        let cart = cart_of(&mut *tx, user_id).await?;
        tx.commit().await?;
        Ok(cart)
    }

    async fn remove_cart_item(&self, user_id: Uuid, product_id: Uuid) -> Result<Cart> {
        let mut tx = self.pool.begin().await?;
        self.ensure_user(&mut tx, user_id).await?;
        sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = $2")
            .bind(user_id).bind(product_id).execute(&mut *tx).await?;
        let cart = cart_of(&mut *tx, user_id).await?;
        tx.commit().await?;
        Ok(cart)
    }

    async fn clear_cart(&self, user_id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        self.ensure_user(&mut tx, user_id).await?;
        sqlx::query("DELETE FROM cart_items WHERE user_id = $1").bind(user_id).execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn add_favorite(&self, user_id: Uuid, product_id: Uuid) -> Result<Favorites> {
        let mut tx = self.pool.begin().await?;
        self.ensure_user(&mut tx, user_id).await?;
        sqlx::query(
            "INSERT INTO favorites (user_id, product_id, position) \
             VALUES ($1, $2, (SELECT COALESCE(MAX(position) + 1, 0) FROM favorites WHERE user_id = $1)) \
             ON CONFLICT (user_id, product_id) DO NOTHING",
        )
        .bind(user_id).bind(product_id)
        .execute(&mut *tx).await?;
        let favorites = favorites_of(&mut *tx, user_id).await?;
        tx.commit().await?;
        Ok(favorites)
    }

    async fn remove_favorite(&self, user_id: Uuid, product_id: Uuid) -> Result<Favorites> {
        let mut tx = self.pool.begin().await?;
        self.ensure_user(&mut tx, user_id).await?;
        sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND product_id = $2")
            .bind(user_id).bind(product_id).execute(&mut *tx).await?;
        let favorites = favorites_of(&mut *tx, user_id).await?;
        tx.commit().await?;
        Ok(favorites)
    }
}

#[async_trait]
impl PaymentLedger for PgStore {
    async fn claim(&self, reference: &str, user_id: Uuid) -> Result<bool> {
        let result = sqlx::query("INSERT INTO payment_reconciliations (reference, user_id) VALUES ($1, $2) ON CONFLICT (reference) DO NOTHING")
            .bind(reference).bind(user_id).execute(&self.pool).await?;
        Ok(result.rows_affected() == 1)
    }

    async fn release(&self, reference: &str) -> Result<()> {
        sqlx::query("DELETE FROM payment_reconciliations WHERE reference = $1").bind(reference).execute(&self.pool).await?;
        Ok(())
    }
}
