//! # Error Types
//!
//! Domain-specific error types for checkout-core.
//!
//! The pure crate has one failure mode: a request that is malformed.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  checkout-core errors (this file)                                      │
//! │  ├── ValidationError  - Malformed pricing requests                     │
//! │  └── CouponRejection  - Shopper-facing coupon outcomes (coupon.rs)     │
//! │                                                                         │
//! │  checkout-db errors (separate crate)                                   │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  checkout-engine errors                                                │
//! │  ├── PricingError     - The only error a total calculation returns     │
//! │  ├── CarrierError     - Absorbed into shipping fallback tiers          │
//! │  └── CouponUsageError - Redemption conflicts                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Invalid coupons and missing tax configuration are NOT errors here.
//! They are ordinary outcomes carried in result types.

use thiserror::Error;

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised once at the boundary, before any pricing component runs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// The cart has no lines.
    #[error("Cart is empty")]
    EmptyCart,

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., bad country code).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// A cart line references a product the catalogue doesn't know.
    #[error("Product not found: {product_id}")]
    UnknownProduct { product_id: String },
}

impl ValidationError {
    /// Creates a Required error for a field.
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    /// Creates an InvalidFormat error.
    pub fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
