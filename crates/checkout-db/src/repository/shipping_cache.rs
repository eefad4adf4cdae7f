//! # Shipping Rate Cache Repository
//!
//! Durable store for per-unit carrier quotes, keyed by
//! `(product_id, variant_id, country_code, region_code)`.
//!
//! Writes are upserts: the last writer wins. Expiry is stored as unix
//! milliseconds so `purge_expired` can compare in SQL.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use checkout_core::{DeliveryEstimate, Money, ShippingRateCacheEntry, ShippingRateKey};

#[derive(Debug, FromRow)]
struct CacheRow {
    product_id: String,
    variant_id: String,
    country_code: String,
    region_code: String,
    cost_cents: i64,
    min_delivery_days: i64,
    max_delivery_days: i64,
    expires_at_ms: i64,
}

impl TryFrom<CacheRow> for ShippingRateCacheEntry {
    type Error = DbError;

    fn try_from(row: CacheRow) -> Result<Self, Self::Error> {
        let expires_at = DateTime::<Utc>::from_timestamp_millis(row.expires_at_ms)
            .ok_or_else(|| DbError::InvalidData(format!("expires_at_ms {}", row.expires_at_ms)))?;
        let days = |v: i64| {
            u32::try_from(v).map_err(|_| DbError::InvalidData(format!("delivery days {v}")))
        };

        Ok(ShippingRateCacheEntry {
            key: ShippingRateKey::new(
                row.product_id,
                row.variant_id,
                &row.country_code,
                Some(row.region_code.as_str()),
            ),
            cost: Money::from_cents(row.cost_cents),
            delivery_estimate: DeliveryEstimate::new(
                days(row.min_delivery_days)?,
                days(row.max_delivery_days)?,
            ),
            expires_at,
        })
    }
}

fn region_column(key: &ShippingRateKey) -> &str {
    key.region_code.as_deref().unwrap_or("")
}

/// Repository for the shipping-rate cache table.
#[derive(Debug, Clone)]
pub struct ShippingRateCacheRepository {
    pool: SqlitePool,
}

impl ShippingRateCacheRepository {
    /// Creates a new ShippingRateCacheRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ShippingRateCacheRepository { pool }
    }

    /// Returns the entry for `key` only if it is still fresh at `now`.
    pub async fn get_fresh(
        &self,
        key: &ShippingRateKey,
        now: DateTime<Utc>,
    ) -> DbResult<Option<ShippingRateCacheEntry>> {
        let row = sqlx::query_as::<_, CacheRow>(
            r#"
            SELECT product_id, variant_id, country_code, region_code,
                   cost_cents, min_delivery_days, max_delivery_days, expires_at_ms
            FROM shipping_rate_cache
            WHERE product_id = ?1 AND variant_id = ?2
              AND country_code = ?3 AND region_code = ?4
              AND expires_at_ms > ?5
            "#,
        )
        .bind(&key.product_id)
        .bind(&key.variant_id)
        .bind(&key.country_code)
        .bind(region_column(key))
        .bind(now.timestamp_millis())
        .fetch_optional(&self.pool)
        .await?;

        row.map(ShippingRateCacheEntry::try_from).transpose()
    }

    /// Inserts or replaces the entry for its key.
    pub async fn upsert(&self, entry: &ShippingRateCacheEntry) -> DbResult<()> {
        debug!(
            product_id = %entry.key.product_id,
            country = %entry.key.country_code,
            cost_cents = entry.cost.cents(),
            "Caching shipping rate"
        );

        sqlx::query(
            r#"
            INSERT INTO shipping_rate_cache (
                product_id, variant_id, country_code, region_code,
                cost_cents, min_delivery_days, max_delivery_days,
                expires_at_ms, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT (product_id, variant_id, country_code, region_code) DO UPDATE SET
                cost_cents = excluded.cost_cents,
                min_delivery_days = excluded.min_delivery_days,
                max_delivery_days = excluded.max_delivery_days,
                expires_at_ms = excluded.expires_at_ms,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&entry.key.product_id)
        .bind(&entry.key.variant_id)
        .bind(&entry.key.country_code)
        .bind(region_column(&entry.key))
        .bind(entry.cost.cents())
        .bind(i64::from(entry.delivery_estimate.min_days))
        .bind(i64::from(entry.delivery_estimate.max_days))
        .bind(entry.expires_at.timestamp_millis())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Deletes entries expired at `now`. Returns the number removed.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM shipping_rate_cache WHERE expires_at_ms <= ?1")
            .bind(now.timestamp_millis())
            .execute(&self.pool)
            .await?;

        debug!(removed = result.rows_affected(), "Purged expired shipping rates");
        Ok(result.rows_affected())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap()
    }

    fn entry(region: Option<&str>, cents: i64, ttl_hours: i64) -> ShippingRateCacheEntry {
        ShippingRateCacheEntry {
            key: ShippingRateKey::new("p1", "v1", "US", region),
            cost: Money::from_cents(cents),
            delivery_estimate: DeliveryEstimate::new(3, 5),
            expires_at: now() + Duration::hours(ttl_hours),
        }
    }

    #[tokio::test]
    async fn test_upsert_and_get_fresh() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.shipping_cache();

        let e = entry(Some("CA"), 450, 24);
        repo.upsert(&e).await.unwrap();

        let hit = repo.get_fresh(&e.key, now()).await.unwrap().unwrap();
        assert_eq!(hit, e);

        // Same country, no region: a different key.
        let other = ShippingRateKey::new("p1", "v1", "US", None);
        assert!(repo.get_fresh(&other, now()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_entry_not_served() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.shipping_cache();

        let e = entry(None, 450, 24);
        repo.upsert(&e).await.unwrap();

        assert!(repo
            .get_fresh(&e.key, now() + Duration::hours(24))
            .await
            .unwrap()
            .is_none());
        assert_eq!(repo.purge_expired(now() + Duration::hours(25)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_last_writer_wins() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.shipping_cache();

        repo.upsert(&entry(None, 450, 24)).await.unwrap();
        repo.upsert(&entry(None, 520, 48)).await.unwrap();

        let key = ShippingRateKey::new("p1", "v1", "US", None);
        let hit = repo.get_fresh(&key, now()).await.unwrap().unwrap();
        assert_eq!(hit.cost.cents(), 520);
        assert_eq!(hit.expires_at, now() + Duration::hours(48));
    }
}
