//! # Coupon Repository
//!
//! Coupon lookup and usage recording.
//!
//! ## Redemption Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    record_usage(coupon, user, order)                    │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │   │                                                                     │
//! │   ├── UPDATE coupons SET used_count = used_count + 1                    │
//! │   │   WHERE id = ? AND (usage_limit IS NULL OR used_count < limit)      │
//! │   │        │                                                            │
//! │   │        └── 0 rows? → missing coupon or LimitReached (rollback)      │
//! │   │                                                                     │
//! │   ├── INSERT INTO coupon_usages (...)                                   │
//! │   │        │                                                            │
//! │   │        └── UNIQUE(coupon_id, user_id) for single-use rows           │
//! │   │            fails for a second redemption (rollback)                 │
//! │   │                                                                     │
//! │  COMMIT  → used_count rose by exactly one, one usage row written        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The write comes first so the transaction takes SQLite's write lock
//! before it reads anything.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use checkout_core::types::normalize_coupon_code;
use checkout_core::{ApplicableTo, Coupon, CouponUsageRecord, DiscountType, Money};

#[derive(Debug, FromRow)]
struct CouponRow {
    id: String,
    code: String,
    discount_type: DiscountType,
    discount_value: f64,
    min_order_amount_cents: Option<i64>,
    max_discount_amount_cents: Option<i64>,
    usage_limit: Option<i64>,
    used_count: i64,
    is_single_use: bool,
    valid_from: DateTime<Utc>,
    valid_until: Option<DateTime<Utc>>,
    applicable_to: ApplicableTo,
    is_active: bool,
}

impl CouponRow {
    fn into_coupon(self, categories: Vec<String>, products: Vec<String>) -> Coupon {
        Coupon {
            id: self.id,
            code: self.code,
            discount_type: self.discount_type,
            discount_value: self.discount_value,
            min_order_amount: self.min_order_amount_cents.map(Money::from_cents),
            max_discount_amount: self.max_discount_amount_cents.map(Money::from_cents),
            usage_limit: self.usage_limit,
            used_count: self.used_count,
            is_single_use: self.is_single_use,
            valid_from: self.valid_from,
            valid_until: self.valid_until,
            applicable_to: self.applicable_to,
            categories,
            products,
            is_active: self.is_active,
        }
    }
}

#[derive(Debug, FromRow)]
struct UsageRow {
    id: String,
    coupon_id: String,
    user_id: Option<String>,
    order_id: String,
    discount_amount_cents: i64,
    created_at: DateTime<Utc>,
}

impl From<UsageRow> for CouponUsageRecord {
    fn from(row: UsageRow) -> Self {
        CouponUsageRecord {
            id: row.id,
            coupon_id: row.coupon_id,
            user_id: row.user_id,
            order_id: row.order_id,
            discount_amount: Money::from_cents(row.discount_amount_cents),
            created_at: row.created_at,
        }
    }
}

/// Outcome of a usage write that did not hit a database error.
#[derive(Debug, Clone, PartialEq)]
pub enum UsageWrite {
    Recorded(CouponUsageRecord),
    /// The usage cap was reached before this redemption committed.
    LimitReached,
}

const COUPON_COLUMNS: &str = r#"
    id, code, discount_type, discount_value,
    min_order_amount_cents, max_discount_amount_cents,
    usage_limit, used_count, is_single_use,
    valid_from, valid_until, applicable_to, is_active
"#;

/// Repository for coupon database operations.
#[derive(Debug, Clone)]
pub struct CouponRepository {
    pool: SqlitePool,
}

impl CouponRepository {
    /// Creates a new CouponRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CouponRepository { pool }
    }

    /// Looks up a coupon by code. The code is trimmed and upper-cased first.
    pub async fn find_by_code(&self, code: &str) -> DbResult<Option<Coupon>> {
        let code = normalize_coupon_code(code);
        debug!(code = %code, "Looking up coupon");

        let sql = format!("SELECT {COUPON_COLUMNS} FROM coupons WHERE code = ?1");
        let row = sqlx::query_as::<_, CouponRow>(&sql)
            .bind(&code)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    /// Gets a coupon by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Coupon>> {
        let sql = format!("SELECT {COUPON_COLUMNS} FROM coupons WHERE id = ?1");
        let row = sqlx::query_as::<_, CouponRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    async fn hydrate(&self, row: CouponRow) -> DbResult<Coupon> {
        let categories: Vec<String> = sqlx::query_scalar(
            "SELECT category FROM coupon_categories WHERE coupon_id = ?1 ORDER BY category",
        )
        .bind(&row.id)
        .fetch_all(&self.pool)
        .await?;

        let products: Vec<String> = sqlx::query_scalar(
            "SELECT product_id FROM coupon_products WHERE coupon_id = ?1 ORDER BY product_id",
        )
        .bind(&row.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(row.into_coupon(categories, products))
    }

    /// Inserts a coupon with its category and product filters.
    pub async fn insert(&self, coupon: &Coupon) -> DbResult<()> {
        let code = normalize_coupon_code(&coupon.code);
        debug!(id = %coupon.id, code = %code, "Inserting coupon");

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO coupons (
                id, code, discount_type, discount_value,
                min_order_amount_cents, max_discount_amount_cents,
                usage_limit, used_count, is_single_use,
                valid_from, valid_until, applicable_to, is_active,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            "#,
        )
        .bind(&coupon.id)
        .bind(&code)
        .bind(coupon.discount_type)
        .bind(coupon.discount_value)
        .bind(coupon.min_order_amount.map(|m| m.cents()))
        .bind(coupon.max_discount_amount.map(|m| m.cents()))
        .bind(coupon.usage_limit)
        .bind(coupon.used_count)
        .bind(coupon.is_single_use)
        .bind(coupon.valid_from)
        .bind(coupon.valid_until)
        .bind(coupon.applicable_to)
        .bind(coupon.is_active)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        for category in &coupon.categories {
            sqlx::query("INSERT INTO coupon_categories (coupon_id, category) VALUES (?1, ?2)")
                .bind(&coupon.id)
                .bind(category)
                .execute(&mut *tx)
                .await?;
        }

        for product_id in &coupon.products {
            sqlx::query("INSERT INTO coupon_products (coupon_id, product_id) VALUES (?1, ?2)")
                .bind(&coupon.id)
                .bind(product_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Whether a user has a usage record for a coupon.
    pub async fn has_user_used(&self, coupon_id: &str, user_id: &str) -> DbResult<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM coupon_usages WHERE coupon_id = ?1 AND user_id = ?2",
        )
        .bind(coupon_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }

    /// Records a redemption and increments `used_count` atomically.
    ///
    /// ## Returns
    /// * `Ok(UsageWrite::Recorded)` - committed
    /// * `Ok(UsageWrite::LimitReached)` - cap hit, nothing written
    /// * `Err(DbError::UniqueViolation)` - single-use coupon already redeemed by this user
    /// * `Err(DbError::NotFound)` - no such coupon
    pub async fn record_usage(
        &self,
        coupon_id: &str,
        user_id: Option<&str>,
        order_id: &str,
        discount_amount: Money,
    ) -> DbResult<UsageWrite> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE coupons
            SET used_count = used_count + 1, updated_at = ?1
            WHERE id = ?2
              AND (usage_limit IS NULL OR used_count < usage_limit)
            "#,
        )
        .bind(now)
        .bind(coupon_id)
        .execute(&mut *tx)
        .await?;

        let is_single_use: Option<bool> =
            sqlx::query_scalar("SELECT is_single_use FROM coupons WHERE id = ?1")
                .bind(coupon_id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some(is_single_use) = is_single_use else {
            return Err(DbError::not_found("Coupon", coupon_id));
        };

        if updated.rows_affected() == 0 {
            debug!(coupon_id = %coupon_id, "Usage limit reached during redemption");
            return Ok(UsageWrite::LimitReached);
        }

        let record = CouponUsageRecord {
            id: Uuid::new_v4().to_string(),
            coupon_id: coupon_id.to_string(),
            user_id: user_id.map(str::to_string),
            order_id: order_id.to_string(),
            discount_amount,
            created_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO coupon_usages (
                id, coupon_id, user_id, order_id,
                discount_amount_cents, is_single_use, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&record.id)
        .bind(&record.coupon_id)
        .bind(&record.user_id)
        .bind(&record.order_id)
        .bind(record.discount_amount.cents())
        .bind(is_single_use)
        .bind(record.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            coupon_id = %coupon_id,
            order_id = %order_id,
            discount_cents = discount_amount.cents(),
            "Coupon usage recorded"
        );
        Ok(UsageWrite::Recorded(record))
    }

    /// All redemptions of a coupon, oldest first.
    pub async fn usage_history(&self, coupon_id: &str) -> DbResult<Vec<CouponUsageRecord>> {
        let rows = sqlx::query_as::<_, UsageRow>(
            r#"
            SELECT id, coupon_id, user_id, order_id, discount_amount_cents, created_at
            FROM coupon_usages
            WHERE coupon_id = ?1
            ORDER BY created_at, rowid
            "#,
        )
        .bind(coupon_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(CouponUsageRecord::from).collect())
    }

    /// Deletes a coupon. Fails with a foreign key violation while usage
    /// history references it.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM coupons WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Coupon", id));
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
