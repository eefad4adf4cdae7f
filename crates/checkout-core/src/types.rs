//! # Domain Types
//!
//! Core domain types used throughout the checkout engine.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    CartLine     │   │ShippingAddress  │   │   ProductInfo   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  product_id     │   │  country_code   │   │  category       │       │
//! │  │  variant_id     │   │  region_code?   │   │  carrier ref    │       │
//! │  │  quantity       │   │  city           │   │  base_price     │       │
//! │  │  unit_price     │   │  postal_code    │   └─────────────────┘       │
//! │  │  category       │   └─────────────────┘                             │
//! │  └─────────────────┘                                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Coupon      │   │TaxConfiguration │   │ ShippingRate    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │   CacheEntry    │       │
//! │  │  code (UPPER)   │   │  is_active      │   │  ─────────────  │       │
//! │  │  discount_type  │   │  default_rate   │   │  4-tuple key    │       │
//! │  │  applicable_to  │   │  country_rates  │   │  cost, expiry   │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Result types produced by the pricing components live next to the logic
//! that produces them: [`crate::shipping`], [`crate::tax`], [`crate::coupon`]
//! and [`crate::totals`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Cart Input
// =============================================================================

/// A cart line as sent by the storefront, before any server-side lookup.
///
/// Prices from the client are never trusted; the engine resolves each
/// request line into a [`CartLine`] through the product catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartLineRequest {
    pub product_id: String,
    pub variant_id: String,
    pub quantity: i64,
}

/// A priced cart line.
///
/// Ephemeral: constructed per request and never persisted as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartLine {
    pub product_id: String,
    pub variant_id: String,
    /// Number of units (1..=999).
    pub quantity: i64,
    /// Price of one unit.
    pub unit_price: Money,
    /// Catalogue category, used for coupon applicability.
    pub product_category: String,
}

impl CartLine {
    /// Creates a cart line.
    pub fn new(
        product_id: impl Into<String>,
        variant_id: impl Into<String>,
        quantity: i64,
        unit_price: Money,
        product_category: impl Into<String>,
    ) -> Self {
        CartLine {
            product_id: product_id.into(),
            variant_id: variant_id.into(),
            quantity,
            unit_price,
            product_category: product_category.into(),
        }
    }

    /// Returns `unit_price × quantity`.
    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }
}

/// Sums line totals. Exact in cents, so no rounding is needed.
pub fn cart_subtotal(lines: &[CartLine]) -> Money {
    lines.iter().map(CartLine::line_total).sum()
}

/// Destination used for shipping and tax resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ShippingAddress {
    /// ISO-3166 alpha-2 country code, e.g. `US`.
    pub country_code: String,
    /// State/province code, e.g. `CA`.
    #[serde(default)]
    pub region_code: Option<String>,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub postal_code: String,
}

impl ShippingAddress {
    /// Creates an address with only the fields pricing needs.
    pub fn new(country_code: impl Into<String>, region_code: Option<String>) -> Self {
        ShippingAddress {
            country_code: country_code.into(),
            region_code,
            city: String::new(),
            postal_code: String::new(),
        }
    }
}

// =============================================================================
// Product Lookup
// =============================================================================

/// The slice of a catalogue product that pricing needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductInfo {
    pub product_id: String,
    pub category: String,
    /// Identifier of the product at the carrier / fulfilment partner.
    pub carrier_product_ref: String,
    pub base_price: Money,
}

// =============================================================================
// Delivery Estimate
// =============================================================================

/// Estimated delivery window in days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DeliveryEstimate {
    pub min_days: u32,
    pub max_days: u32,
}

impl DeliveryEstimate {
    pub const fn new(min_days: u32, max_days: u32) -> Self {
        DeliveryEstimate { min_days, max_days }
    }
}

// =============================================================================
// Shipping Rate Cache
// =============================================================================

/// Cache key for a per-line carrier rate.
///
/// The full 4-tuple is part of the key so two destinations in the same
/// country but different regions never share an entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShippingRateKey {
    pub product_id: String,
    pub variant_id: String,
    pub country_code: String,
    pub region_code: Option<String>,
}

impl ShippingRateKey {
    /// Builds a key, normalising codes to upper case and blank regions to `None`.
    pub fn new(
        product_id: impl Into<String>,
        variant_id: impl Into<String>,
        country_code: &str,
        region_code: Option<&str>,
    ) -> Self {
        ShippingRateKey {
            product_id: product_id.into(),
            variant_id: variant_id.into(),
            country_code: country_code.trim().to_uppercase(),
            region_code: region_code
                .map(|r| r.trim().to_uppercase())
                .filter(|r| !r.is_empty()),
        }
    }
}

/// A cached per-unit carrier rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingRateCacheEntry {
    pub key: ShippingRateKey,
    /// Cost of shipping ONE unit.
    pub cost: Money,
    pub delivery_estimate: DeliveryEstimate,
    pub expires_at: DateTime<Utc>,
}

impl ShippingRateCacheEntry {
    /// An entry is served only while `now < expires_at`.
    #[inline]
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

// =============================================================================
// Tax Configuration
// =============================================================================

/// A tax rate for one country inside a [`TaxConfiguration`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CountryTaxRate {
    pub country_code: String,
    /// Whole-number percentage: `20.0` means 20%.
    pub rate_percent: f64,
    /// Whether shipping is part of the taxable amount.
    pub applies_to_shipping: bool,
    /// Higher wins when a country is (invalidly) listed more than once.
    #[serde(default)]
    pub priority: i32,
}

/// Tax configuration. At most one is active at a time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxConfiguration {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub is_active: bool,
    /// Whole-number percentage applied by the fallback policy.
    pub default_rate_percent: f64,
    pub country_rates: Vec<CountryTaxRate>,
}

// =============================================================================
// Coupons
// =============================================================================

/// How a coupon's `discount_value` is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum DiscountType {
    /// `discount_value` is a whole-number percentage.
    Percentage,
    /// `discount_value` is an amount in cents.
    FixedAmount,
}

/// Which cart lines a coupon may discount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum ApplicableTo {
    #[default]
    AllProducts,
    CategorySpecific,
    ProductSpecific,
}

/// A discount coupon.
///
/// Mutated only by usage recording and admin edits. Never deleted while
/// usage history references it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Coupon {
    pub id: String,
    /// Unique, stored upper case.
    pub code: String,
    pub discount_type: DiscountType,
    /// Percentage for `Percentage`, cents for `FixedAmount`.
    pub discount_value: f64,
    pub min_order_amount: Option<Money>,
    /// Cap for percentage discounts.
    pub max_discount_amount: Option<Money>,
    /// `None` means unlimited.
    pub usage_limit: Option<i64>,
    pub used_count: i64,
    pub is_single_use: bool,
    #[ts(as = "String")]
    pub valid_from: DateTime<Utc>,
    /// `None` means open-ended.
    #[ts(as = "Option<String>")]
    pub valid_until: Option<DateTime<Utc>>,
    pub applicable_to: ApplicableTo,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub products: Vec<String>,
    pub is_active: bool,
}

/// A redemption of a coupon on a confirmed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CouponUsageRecord {
    pub id: String,
    pub coupon_id: String,
    pub user_id: Option<String>,
    pub order_id: String,
    pub discount_amount: Money,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Normalises a user-entered coupon code: trimmed and upper case.
///
/// ## Example
/// ```rust
/// use checkout_core::types::normalize_coupon_code;
///
/// assert_eq!(normalize_coupon_code("  save10 "), "SAVE10");
/// ```
pub fn normalize_coupon_code(code: &str) -> String {
    code.trim().to_uppercase()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_line_total_and_subtotal() {
        let lines = vec![
            CartLine::new("1", "v1", 2, Money::from_cents(3000), "shirts"),
            CartLine::new("2", "v1", 1, Money::from_cents(1599), "mugs"),
        ];
        assert_eq!(lines[0].line_total().cents(), 6000);
        assert_eq!(cart_subtotal(&lines).cents(), 7599);
    }

    #[test]
    fn test_rate_key_normalisation() {
        let a = ShippingRateKey::new("1", "v1", "us", Some(" ca "));
        let b = ShippingRateKey::new("1", "v1", "US", Some("CA"));
        assert_eq!(a, b);

        let blank = ShippingRateKey::new("1", "v1", "US", Some(""));
        assert_eq!(blank.region_code, None);

        let other_region = ShippingRateKey::new("1", "v1", "US", Some("NY"));
        assert_ne!(a, other_region);
    }

    #[test]
    fn test_cache_entry_freshness_boundary() {
        let now = Utc::now();
        let entry = ShippingRateCacheEntry {
            key: ShippingRateKey::new("1", "v1", "US", None),
            cost: Money::from_cents(499),
            delivery_estimate: DeliveryEstimate::new(3, 5),
            expires_at: now + Duration::hours(24),
        };
        assert!(entry.is_fresh(now));
        assert!(!entry.is_fresh(entry.expires_at));
    }

    #[test]
    fn test_discount_type_wire_names() {
        let json = serde_json::to_string(&DiscountType::FixedAmount).unwrap();
        assert_eq!(json, "\"FIXED_AMOUNT\"");
        let json = serde_json::to_string(&ApplicableTo::CategorySpecific).unwrap();
        assert_eq!(json, "\"CATEGORY_SPECIFIC\"");
    }
}
