//! # Collaborators
//!
//! The seams between the pricing pipeline and the outside world. Each trait
//! has a SQLite-backed implementation in [`crate::stores`]; the carrier has
//! an HTTP implementation in [`crate::carrier`].
//!
//! ```text
//! ┌──────────────────┐        ┌───────────────────────────────┐
//! │ ShippingResolver │──────► │ ShippingRateCache             │
//! │                  │──────► │ ProductLookup                 │
//! │                  │──────► │ CarrierRateProvider (network) │
//! ├──────────────────┤        ├───────────────────────────────┤
//! │ TaxCalculator    │──────► │ TaxConfigStore                │
//! ├──────────────────┤        ├───────────────────────────────┤
//! │ CouponEngine     │──────► │ CouponStore                   │
//! └──────────────────┘        └───────────────────────────────┘
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use checkout_core::{
    Coupon, CouponUsageRecord, DeliveryEstimate, Money, ProductInfo, ShippingRateCacheEntry,
    ShippingRateKey, TaxConfiguration,
};

use crate::error::{CarrierError, CouponUsageError, StoreError};

/// Highest per-item carrier cost accepted ($10,000.00). Anything above is
/// treated as a malformed quote.
pub const MAX_CARRIER_UNIT_COST_CENTS: i64 = 1_000_000;

/// A per-item carrier quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarrierQuote {
    pub cost_minor_units: i64,
    pub estimated_days: DeliveryEstimate,
}

impl CarrierQuote {
    pub fn cost(&self) -> Money {
        Money::from_cents(self.cost_minor_units)
    }

    /// Accepts the quote only if its cost lies in
    /// `0..=MAX_CARRIER_UNIT_COST_CENTS` and its delivery window is ordered.
    pub fn checked(self) -> Result<Self, CarrierError> {
        if !(0..=MAX_CARRIER_UNIT_COST_CENTS).contains(&self.cost_minor_units) {
            return Err(CarrierError::MalformedResponse(format!(
                "cost_minor_units {} outside 0..={}",
                self.cost_minor_units, MAX_CARRIER_UNIT_COST_CENTS
            )));
        }

        let days = self.estimated_days;
        if days.min_days > days.max_days {
            return Err(CarrierError::MalformedResponse(format!(
                "delivery window {}..{} is inverted",
                days.min_days, days.max_days
            )));
        }

        Ok(self)
    }
}

/// Catalogue reads. Inactive products are reported as missing.
#[async_trait]
pub trait ProductLookup: Send + Sync {
    async fn get_product(&self, product_id: &str) -> Result<Option<ProductInfo>, StoreError>;
}

/// Live per-item shipping quotes.
#[async_trait]
pub trait CarrierRateProvider: Send + Sync {
    async fn quote_shipping(
        &self,
        carrier_product_ref: &str,
        variant_id: &str,
        country_code: &str,
        region_code: Option<&str>,
    ) -> Result<CarrierQuote, CarrierError>;
}

#[async_trait]
pub trait TaxConfigStore: Send + Sync {
    async fn get_active_tax_config(&self) -> Result<Option<TaxConfiguration>, StoreError>;
}

#[async_trait]
pub trait CouponStore: Send + Sync {
    /// Looks up by normalized (trimmed, upper-case) code.
    async fn find_by_code(&self, code: &str) -> Result<Option<Coupon>, StoreError>;

    async fn has_user_used(&self, coupon_id: &str, user_id: &str) -> Result<bool, StoreError>;

    /// Inserts the usage record and increments `used_count` atomically.
    async fn record_usage(
        &self,
        coupon_id: &str,
        user_id: Option<&str>,
        order_id: &str,
        discount_amount: Money,
    ) -> Result<CouponUsageRecord, CouponUsageError>;

    async fn usage_history(&self, coupon_id: &str) -> Result<Vec<CouponUsageRecord>, StoreError>;
}

/// Shared cache of carrier quotes. Writes are upserts.
#[async_trait]
pub trait ShippingRateCache: Send + Sync {
    /// Returns the entry only if it is still fresh at `now`.
    async fn get(
        &self,
        key: &ShippingRateKey,
        now: DateTime<Utc>,
    ) -> Result<Option<ShippingRateCacheEntry>, StoreError>;

    async fn put(&self, entry: ShippingRateCacheEntry) -> Result<(), StoreError>;

    /// Deletes entries that are no longer fresh at `now`; returns how many.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;
}
