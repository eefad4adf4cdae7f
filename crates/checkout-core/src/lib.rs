//! # checkout-core: Pure Pricing Logic
//!
//! This crate holds every pricing RULE of the checkout engine as pure
//! functions. Nothing here touches a database, the network or the clock.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Checkout Pricing Architecture                       │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Storefront / Order Service                   │   │
//! │  │     cart page ──► checkout page ──► order confirmation          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 checkout-engine (orchestration)                 │   │
//! │  │   carrier HTTP, rate cache, store lookups, concurrency          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ checkout-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────┐ │   │
//! │  │   │  money   │ │ shipping │ │   tax    │ │  coupon  │ │totals│ │   │
//! │  │   │  round2  │ │ tiers    │ │ lookup   │ │  rules   │ │ sum  │ │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └──────────┘ └──────┘ │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - `Money` (integer cents) and `round2`
//! - [`types`] - Cart lines, addresses, coupons, tax configuration
//! - [`validation`] - Request boundary checks
//! - [`shipping`] - Per-line results into a cart quote
//! - [`tax`] - Country rate lookup and tax math
//! - [`coupon`] - Eligibility checks and discount amounts
//! - [`totals`] - The order total formula
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use checkout_core::money::Money;
//! use checkout_core::totals::OrderTotals;
//!
//! let totals = OrderTotals::combine(
//!     Money::from_cents(6000), // subtotal
//!     Money::zero(),           // shipping (free over $50)
//!     Money::from_cents(495),  // tax
//!     Money::zero(),           // discount
//! );
//! assert_eq!(totals.final_total.cents(), 6495);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod coupon;
pub mod error;
pub mod money;
pub mod shipping;
pub mod tax;
pub mod totals;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use coupon::{CouponDiscount, CouponRejection, CouponValidation};
pub use error::ValidationError;
pub use money::{round2, Money};
pub use shipping::{
    FallbackRate, FallbackRateTable, LineShippingCost, RateSource, ShippingPolicy, ShippingQuote,
    ShippingTier,
};
pub use tax::{TaxConfigValidation, TaxFallbackPolicy, TaxResult, TaxSource};
pub use totals::{OrderTotals, PricingBreakdown};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines allowed in a single cart.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single line.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Highest accepted unit price ($1,000,000.00).
///
/// With [`MAX_ITEM_QUANTITY`] and [`MAX_CART_ITEMS`] this keeps every line
/// total and subtotal far inside `i64` cents.
pub const MAX_UNIT_PRICE_CENTS: i64 = 100_000_000;

/// Subtotal at or above which shipping is waived ($50.00).
pub const DEFAULT_FREE_SHIPPING_THRESHOLD_CENTS: i64 = 5000;

/// Flat charge for a whole cart when the carrier is unreachable.
pub const DEFAULT_EMERGENCY_FLAT_RATE_CENTS: i64 = 999;

/// Carrier quotes are cached for 24 hours.
pub const DEFAULT_RATE_CACHE_TTL_SECS: u64 = 86_400;
