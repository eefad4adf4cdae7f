//! # Repository Module
//!
//! Database repository implementations for the checkout engine.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Who Reads What                                       │
//! │                                                                         │
//! │  checkout-engine                                                       │
//! │       │                                                                 │
//! │       │  db.coupons().find_by_code("SAVE10")                           │
//! │       ▼                                                                 │
//! │  ProductRepository            ← cart line re-pricing                   │
//! │  TaxConfigRepository          ← active tax configuration               │
//! │  CouponRepository             ← lookup, usage history, redemption      │
//! │  ShippingRateCacheRepository  ← carrier quotes with expiry             │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod coupon;
pub mod product;
pub mod shipping_cache;
pub mod tax_config;
