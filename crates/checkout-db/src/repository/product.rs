//! # Product Repository
//!
//! The slice of the catalogue that pricing reads: category, carrier
//! reference and base price. Prices submitted by clients are never used;
//! cart lines are re-priced from here.

use chrono::Utc;
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use checkout_core::{Money, ProductInfo};

/// A catalogue product as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub category: String,
    pub carrier_product_ref: String,
    pub base_price: Money,
    pub is_active: bool,
}

impl Product {
    pub fn to_info(&self) -> ProductInfo {
        ProductInfo {
            product_id: self.id.clone(),
            category: self.category.clone(),
            carrier_product_ref: self.carrier_product_ref.clone(),
            base_price: self.base_price,
        }
    }
}

#[derive(Debug, FromRow)]
struct ProductRow {
    id: String,
    name: String,
    category: String,
    carrier_product_ref: String,
    base_price_cents: i64,
    is_active: bool,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            name: row.name,
            category: row.category,
            carrier_product_ref: row.carrier_product_ref,
            base_price: Money::from_cents(row.base_price_cents),
            is_active: row.is_active,
        }
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

    /// Gets a product by its ID, active or not.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(
            r#"
            SELECT id, name, category, carrier_product_ref,
                   base_price_cents, is_active
            FROM products
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Product::from))
    }

    /// Pricing view of an ACTIVE product. Inactive products are unknown.
    pub async fn get_pricing_info(&self, id: &str) -> DbResult<Option<ProductInfo>> {
        debug!(product_id = %id, "Looking up product for pricing");

        let product = self.get_by_id(id).await?;
        Ok(product.filter(|p| p.is_active).map(|p| p.to_info()))
    }

    /// Inserts a new product.
    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, category = %product.category, "Inserting product");

        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, category, carrier_product_ref,
                base_price_cents, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.category)
        .bind(&product.carrier_product_ref)
        .bind(product.base_price.cents())
        .bind(product.is_active)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Counts all products.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    fn tee(id: &str, active: bool) -> Product {
        Product {
            id: id.to_string(),
            name: "Logo Tee".to_string(),
            category: "shirts".to_string(),
            carrier_product_ref: format!("pod-{id}"),
            base_price: Money::from_cents(3000),
            is_active: active,
        }
    }

    #[tokio::test]
    async fn test_insert_and_pricing_info() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        repo.insert(&tee("1", true)).await.unwrap();
        let info = repo.get_pricing_info("1").await.unwrap().unwrap();

        assert_eq!(info.category, "shirts");
        assert_eq!(info.carrier_product_ref, "pod-1");
        assert_eq!(info.base_price.cents(), 3000);
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_inactive_and_missing_products_have_no_pricing_info() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        repo.insert(&tee("2", false)).await.unwrap();
        assert!(repo.get_pricing_info("2").await.unwrap().is_none());
        assert!(repo.get_by_id("2").await.unwrap().is_some());
        assert!(repo.get_pricing_info("404").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_id_is_unique_violation() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        repo.insert(&tee("1", true)).await.unwrap();
        let err = repo.insert(&tee("1", true)).await.unwrap_err();
        assert!(matches!(err, crate::DbError::UniqueViolation { .. }));
    }
}
