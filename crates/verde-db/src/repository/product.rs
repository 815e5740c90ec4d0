//! # Product Repository
//!
//! Catalog CRUD. Products referenced by historical sales survive through
//! the snapshot pattern on sale items, so deleting a product never
//! rewrites history.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use verde_core::validation::{validate_name, validate_price_cents, validate_sku};
use verde_core::Product;

/// Input for creating or updating a product.
#[derive(Debug, Clone)]
pub struct ProductInput {
    pub name: String,
    pub sku: Option<String>,
    pub price_cents: i64,
    pub track_stock: bool,
    pub stock: i64,
}

impl ProductInput {
    fn validate(&self) -> DbResult<()> {
        validate_name(&self.name).map_err(DbError::InvalidInput)?;
        validate_price_cents(self.price_cents).map_err(DbError::InvalidInput)?;
        if let Some(sku) = &self.sku {
            validate_sku(sku).map_err(DbError::InvalidInput)?;
        }
        Ok(())
    }
}

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Inserts a new product. Duplicate SKUs surface as
    /// [`DbError::UniqueViolation`] via the partial unique index.
    pub async fn create(&self, input: ProductInput) -> DbResult<Product> {
        input.validate()?;

        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            name: input.name.trim().to_string(),
            sku: input.sku.map(|s| s.trim().to_string()),
            price_cents: input.price_cents,
            track_stock: input.track_stock,
            stock: if input.track_stock { input.stock } else { 0 },
            created_at: now,
            updated_at: now,
        };

        debug!(id = %product.id, name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (id, name, sku, price_cents, track_stock, stock, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.sku)
        .bind(product.price_cents)
        .bind(product.track_stock)
        .bind(product.stock)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(product)
    }

    /// Gets a product by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, sku, price_cents, track_stock, stock, created_at, updated_at
            FROM products
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Lists all products, alphabetical.
    pub async fn list(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, sku, price_cents, track_stock, stock, created_at, updated_at
            FROM products
            ORDER BY name COLLATE NOCASE
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Replaces the mutable fields of a product.
    pub async fn update(&self, id: &str, input: ProductInput) -> DbResult<Product> {
        input.validate()?;

        let now = Utc::now();
        let stock = if input.track_stock { input.stock } else { 0 };
        let result = sqlx::query(
            r#"
            UPDATE products
            SET name = ?2, sku = ?3, price_cents = ?4, track_stock = ?5, stock = ?6, updated_at = ?7
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(input.name.trim())
        .bind(input.sku.as_deref().map(str::trim))
        .bind(input.price_cents)
        .bind(input.track_stock)
        .bind(stock)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Deletes a product from the catalog.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    fn input(name: &str, sku: Option<&str>, price_cents: i64) -> ProductInput {
        ProductInput {
            name: name.to_string(),
            sku: sku.map(str::to_string),
            price_cents,
            track_stock: false,
            stock: 0,
        }
    }

    #[tokio::test]
    async fn test_create_and_fetch() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        let created = repo
            .create(input("Café americano", Some("CAFE-01"), 3500))
            .await
            .unwrap();
        let fetched = repo.get_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Café americano");
        assert_eq!(fetched.price_cents, 3500);
    }

    #[tokio::test]
    async fn test_duplicate_sku_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        repo.create(input("One", Some("SAME-SKU"), 100))
            .await
            .unwrap();
        let err = repo
            .create(input("Two", Some("SAME-SKU"), 200))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        let created = repo.create(input("Concha", None, 1500)).await.unwrap();
        let updated = repo
            .update(&created.id, input("Concha grande", None, 1800))
            .await
            .unwrap();
        assert_eq!(updated.name, "Concha grande");
        assert_eq!(updated.price_cents, 1800);

        repo.delete(&created.id).await.unwrap();
        assert!(repo.get_by_id(&created.id).await.unwrap().is_none());
        assert!(matches!(
            repo.delete(&created.id).await.unwrap_err(),
            DbError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn test_invalid_input_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        assert!(repo.create(input("", None, 100)).await.is_err());
        assert!(repo.create(input("Ok", None, -5)).await.is_err());
        assert!(repo.create(input("Ok", Some("bad sku"), 100)).await.is_err());
    }
}
