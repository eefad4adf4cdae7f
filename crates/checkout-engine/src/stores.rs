//! # SQLite Stores
//!
//! Adapts the `checkout-db` repositories to the collaborator traits.
//! Database errors become [`StoreError::Database`], except in
//! `record_usage`, where the constraint outcomes are part of the contract:
//!
//! | Repository outcome            | `CouponUsageError`  |
//! |-------------------------------|---------------------|
//! | `UsageWrite::LimitReached`    | `UsageLimitReached` |
//! | `DbError::UniqueViolation`    | `AlreadyRedeemed`   |
//! | `DbError::NotFound`           | `CouponNotFound`    |

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use checkout_core::{
    Coupon, CouponUsageRecord, Money, ProductInfo, ShippingRateCacheEntry, ShippingRateKey,
    TaxConfiguration,
};
use checkout_db::{
    CouponRepository, DbError, ProductRepository, ShippingRateCacheRepository,
    TaxConfigRepository, UsageWrite,
};

use crate::collaborators::{CouponStore, ProductLookup, ShippingRateCache, TaxConfigStore};
use crate::error::{CouponUsageError, StoreError};

#[async_trait]
impl ProductLookup for ProductRepository {
    async fn get_product(&self, product_id: &str) -> Result<Option<ProductInfo>, StoreError> {
        Ok(self.get_pricing_info(product_id).await?)
    }
}

#[async_trait]
impl TaxConfigStore for TaxConfigRepository {
    async fn get_active_tax_config(&self) -> Result<Option<TaxConfiguration>, StoreError> {
        Ok(self.get_active().await?)
    }
}

#[async_trait]
impl CouponStore for CouponRepository {
    async fn find_by_code(&self, code: &str) -> Result<Option<Coupon>, StoreError> {
        Ok(CouponRepository::find_by_code(self, code).await?)
    }

    async fn has_user_used(&self, coupon_id: &str, user_id: &str) -> Result<bool, StoreError> {
        Ok(CouponRepository::has_user_used(self, coupon_id, user_id).await?)
    }

    async fn record_usage(
        &self,
        coupon_id: &str,
        user_id: Option<&str>,
        order_id: &str,
        discount_amount: Money,
    ) -> Result<CouponUsageRecord, CouponUsageError> {
        let outcome =
            CouponRepository::record_usage(self, coupon_id, user_id, order_id, discount_amount)
                .await;

        let write = outcome.map_err(|err| match err {
            DbError::UniqueViolation { .. } => CouponUsageError::AlreadyRedeemed {
                coupon_id: coupon_id.to_string(),
            },
            DbError::NotFound { .. } => CouponUsageError::CouponNotFound(coupon_id.to_string()),
            other => CouponUsageError::Store(other.into()),
        })?;

        match write {
            UsageWrite::Recorded(record) => Ok(record),
            UsageWrite::LimitReached => Err(CouponUsageError::UsageLimitReached {
                coupon_id: coupon_id.to_string(),
            }),
        }
    }

    async fn usage_history(&self, coupon_id: &str) -> Result<Vec<CouponUsageRecord>, StoreError> {
        Ok(CouponRepository::usage_history(self, coupon_id).await?)
    }
}

#[async_trait]
impl ShippingRateCache for ShippingRateCacheRepository {
    async fn get(
        &self,
        key: &ShippingRateKey,
        now: DateTime<Utc>,
    ) -> Result<Option<ShippingRateCacheEntry>, StoreError> {
        Ok(self.get_fresh(key, now).await?)
    }

    async fn put(&self, entry: ShippingRateCacheEntry) -> Result<(), StoreError> {
        Ok(self.upsert(&entry).await?)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        Ok(ShippingRateCacheRepository::purge_expired(self, now).await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
