//! # checkout-engine: Order Total Pipeline
//!
//! Computes the final price of a cart: subtotal, shipping, tax and
//! discount, with a fallback tier for every external dependency.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Checkout Pricing Flow                            │
//! │                                                                         │
//! │  Storefront checkout (cart + address + coupon code)                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 checkout-engine (THIS CRATE)                    │   │
//! │  │                                                                 │   │
//! │  │   PricingEngine ──► ShippingResolver ──► carrier / cache        │   │
//! │  │        │        ──► CouponEngine     ──► coupon store           │   │
//! │  │        │        ──► TaxCalculator    ──► tax config store       │   │
//! │  │        ▼                                                        │   │
//! │  │   PricingBreakdown (checkout-core)                              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  checkout-db (SQLite) · carrier rate API (HTTP)                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use checkout_engine::{CheckoutConfig, PricingEngine};
//! use checkout_db::Database;
//!
//! checkout_engine::init_tracing();
//! let config = CheckoutConfig::load(None)?;
//! let db = Database::new(config.db_config()).await?;
//! let engine = PricingEngine::from_database(&config, &db)?;
//!
//! let lines = engine.build_cart_lines(&requests).await?;
//! let breakdown = engine
//!     .calculate_order_totals(&lines, &address, Some("SAVE10"), Some(user_id))
//!     .await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cache;
pub mod carrier;
pub mod clock;
pub mod collaborators;
pub mod config;
pub mod coupon;
pub mod error;
pub mod pricing;
pub mod shipping;
pub mod stores;
pub mod tax;
pub mod telemetry;

#[cfg(test)]
mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use cache::InMemoryRateCache;
pub use carrier::HttpCarrierClient;
pub use clock::{Clock, ManualClock, SystemClock};
pub use collaborators::{
    CarrierQuote, CarrierRateProvider, CouponStore, ProductLookup, ShippingRateCache,
    TaxConfigStore,
};
pub use config::{CacheBackend, CheckoutConfig};
pub use coupon::CouponEngine;
pub use error::{CarrierError, ConfigError, CouponUsageError, PricingError, StoreError};
pub use pricing::{Collaborators, PricingEngine};
pub use shipping::ShippingResolver;
pub use tax::TaxCalculator;
pub use telemetry::init_tracing;
