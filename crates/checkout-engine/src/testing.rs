//! Fake collaborators shared by the engine's unit tests.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use checkout_core::{
    Coupon, CouponUsageRecord, DeliveryEstimate, Money, ProductInfo, ShippingRateCacheEntry,
    ShippingRateKey, TaxConfiguration,
};

use crate::collaborators::{
    CarrierQuote, CarrierRateProvider, CouponStore, ProductLookup, ShippingRateCache,
    TaxConfigStore,
};
use crate::error::{CarrierError, CouponUsageError, StoreError};

pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap()
}

pub fn product(id: &str, category: &str, cents: i64) -> ProductInfo {
    ProductInfo {
        product_id: id.to_string(),
        category: category.to_string(),
        carrier_product_ref: format!("pod-{id}"),
        base_price: Money::from_cents(cents),
    }
}

// =============================================================================
// Catalogue
// =============================================================================

#[derive(Default)]
pub struct FakeCatalogue {
    pub products: HashMap<String, ProductInfo>,
    pub unavailable: bool,
}

impl FakeCatalogue {
    pub fn with(products: Vec<ProductInfo>) -> Self {
        FakeCatalogue {
            products: products
                .into_iter()
                .map(|p| (p.product_id.clone(), p))
                .collect(),
            unavailable: false,
        }
    }
}

#[async_trait]
impl ProductLookup for FakeCatalogue {
    async fn get_product(&self, product_id: &str) -> Result<Option<ProductInfo>, StoreError> {
        if self.unavailable {
            return Err(StoreError::Unavailable("catalogue offline".into()));
        }
        Ok(self.products.get(product_id).cloned())
    }
}

// =============================================================================
// Carrier
// =============================================================================

pub enum CarrierBehavior {
    /// Per-item cost in cents and delivery days for every product.
    Quote(i64, u32, u32),
    Down,
    /// Fails only for the listed carrier references.
    FailFor(Vec<String>, i64),
    Slow(Duration),
}

pub struct FakeCarrier {
    pub behavior: CarrierBehavior,
    pub calls: AtomicUsize,
}

impl FakeCarrier {
    pub fn new(behavior: CarrierBehavior) -> Self {
        FakeCarrier {
            behavior,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn quote(cents: i64, min: u32, max: u32) -> CarrierQuote {
    CarrierQuote {
        cost_minor_units: cents,
        estimated_days: DeliveryEstimate::new(min, max),
    }
}

#[async_trait]
impl CarrierRateProvider for FakeCarrier {
    async fn quote_shipping(
        &self,
        carrier_product_ref: &str,
        _variant_id: &str,
        _country_code: &str,
        _region_code: Option<&str>,
    ) -> Result<CarrierQuote, CarrierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            CarrierBehavior::Quote(cents, min, max) => Ok(quote(*cents, *min, *max)),
            CarrierBehavior::Down => Err(CarrierError::Transport("connection refused".into())),
            CarrierBehavior::FailFor(refs, cents) => {
                if refs.iter().any(|r| r == carrier_product_ref) {
                    Err(CarrierError::Status {
                        status: 502,
                        body: "bad gateway".into(),
                    })
                } else {
                    Ok(quote(*cents, 3, 5))
                }
            }
            CarrierBehavior::Slow(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(quote(100, 1, 2))
            }
        }
    }
}

// =============================================================================
// Cache
// =============================================================================

/// A cache whose every operation fails.
pub struct BrokenCache;

#[async_trait]
impl ShippingRateCache for BrokenCache {
    async fn get(
        &self,
        _key: &ShippingRateKey,
        _now: DateTime<Utc>,
    ) -> Result<Option<ShippingRateCacheEntry>, StoreError> {
        Err(StoreError::Unavailable("cache offline".into()))
    }

    async fn put(&self, _entry: ShippingRateCacheEntry) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("cache offline".into()))
    }

    async fn purge_expired(&self, _now: DateTime<Utc>) -> Result<u64, StoreError> {
        Err(StoreError::Unavailable("cache offline".into()))
    }
}

// =============================================================================
// Tax
// =============================================================================

pub struct FakeTaxStore {
    pub config: Option<TaxConfiguration>,
    pub unavailable: bool,
}

#[async_trait]
impl TaxConfigStore for FakeTaxStore {
    async fn get_active_tax_config(&self) -> Result<Option<TaxConfiguration>, StoreError> {
        if self.unavailable {
            return Err(StoreError::Unavailable("tax store offline".into()));
        }
        Ok(self.config.clone())
    }
}

// =============================================================================
// Coupons
// =============================================================================

#[derive(Default)]
pub struct FakeCouponStore {
    pub coupons: Vec<Coupon>,
    pub used_by: Mutex<Vec<(String, String)>>,
    pub unavailable: bool,
}

impl FakeCouponStore {
    pub fn with(coupons: Vec<Coupon>) -> Self {
        FakeCouponStore {
            coupons,
            ..Default::default()
        }
    }
}

#[async_trait]
impl CouponStore for FakeCouponStore {
    async fn find_by_code(&self, code: &str) -> Result<Option<Coupon>, StoreError> {
        if self.unavailable {
            return Err(StoreError::Unavailable("coupon store offline".into()));
        }
        Ok(self.coupons.iter().find(|c| c.code == code).cloned())
    }

    async fn has_user_used(&self, coupon_id: &str, user_id: &str) -> Result<bool, StoreError> {
        let used = self.used_by.lock().unwrap();
        Ok(used.iter().any(|(c, u)| c == coupon_id && u == user_id))
    }

    async fn record_usage(
        &self,
        coupon_id: &str,
        user_id: Option<&str>,
        order_id: &str,
        discount_amount: Money,
    ) -> Result<CouponUsageRecord, CouponUsageError> {
        if let Some(user) = user_id {
            self.used_by
                .lock()
                .unwrap()
                .push((coupon_id.to_string(), user.to_string()));
        }
        Ok(CouponUsageRecord {
            id: format!("usage-{order_id}"),
            coupon_id: coupon_id.to_string(),
            user_id: user_id.map(str::to_string),
            order_id: order_id.to_string(),
            discount_amount,
            created_at: start(),
        })
    }

    async fn usage_history(&self, _coupon_id: &str) -> Result<Vec<CouponUsageRecord>, StoreError> {
        Ok(vec![])
    }
}
