//! # Engine Error Types
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Engine Error Categories                           │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  PricingError   │  │  CarrierError   │  │  CouponUsageError       │ │
//! │  │  (aborts)       │  │  (absorbed)     │  │  (mark_used only)       │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  Validation     │  │  Timeout        │  │  AlreadyRedeemed        │ │
//! │  │  Catalogue...   │  │  Transport      │  │  UsageLimitReached      │ │
//! │  │                 │  │  Status         │  │  CouponNotFound         │ │
//! │  │                 │  │  Malformed...   │  │  Store                  │ │
//! │  │                 │  │  UnknownProduct │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐                              │
//! │  │   StoreError    │  │   ConfigError   │                              │
//! │  │  (degrades)     │  │  (startup)      │                              │
//! │  └─────────────────┘  └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Only [`PricingError`] reaches the caller of a pricing run. Carrier and
//! store failures are logged and turned into fallback tiers.

use thiserror::Error;

use checkout_core::ValidationError;
use checkout_db::DbError;

// =============================================================================
// Pricing
// =============================================================================

/// Errors that abort a pricing run.
#[derive(Debug, Error)]
pub enum PricingError {
    /// Malformed request: empty cart, bad quantity, missing country.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The catalogue could not be read while re-pricing raw cart lines.
    #[error("Product catalogue unavailable: {0}")]
    CatalogueUnavailable(#[from] StoreError),
}

// =============================================================================
// Carrier
// =============================================================================

/// Failures talking to the carrier rate API.
#[derive(Debug, Error)]
pub enum CarrierError {
    #[error("Carrier request timed out after {0} ms")]
    Timeout(u64),

    #[error("Carrier transport error: {0}")]
    Transport(String),

    #[error("Carrier returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed carrier response: {0}")]
    MalformedResponse(String),

    /// No carrier reference could be found for the product.
    #[error("Unknown product for carrier lookup: {0}")]
    UnknownProduct(String),
}

impl CarrierError {
    /// Returns true if a later attempt might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            CarrierError::Timeout(_) | CarrierError::Transport(_) => true,
            CarrierError::Status { status, .. } => *status >= 500 || *status == 429,
            CarrierError::MalformedResponse(_) | CarrierError::UnknownProduct(_) => false,
        }
    }
}

impl From<reqwest::Error> for CarrierError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            CarrierError::MalformedResponse(err.to_string())
        } else {
            CarrierError::Transport(err.to_string())
        }
    }
}

// =============================================================================
// Stores
// =============================================================================

/// Failures reading or writing a collaborator store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] DbError),

    /// A non-database store could not be reached.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

// =============================================================================
// Coupon Usage
// =============================================================================

/// Failures recording a confirmed redemption.
#[derive(Debug, Error)]
pub enum CouponUsageError {
    #[error("Coupon {coupon_id} has already been redeemed by this user")]
    AlreadyRedeemed { coupon_id: String },

    #[error("Coupon {coupon_id} has reached its usage limit")]
    UsageLimitReached { coupon_id: String },

    #[error("Coupon not found: {0}")]
    CouponNotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Database(e) => e.is_transient(),
            StoreError::Unavailable(_) => true,
        }
    }
}

impl CouponUsageError {
    /// True when the order service may retry the redemption as-is.
    ///
    /// Constraint outcomes are final: retrying an `AlreadyRedeemed`
    /// write can never succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            CouponUsageError::Store(e) => e.is_transient(),
            _ => false,
        }
    }
}

// =============================================================================
// Configuration
// =============================================================================

/// Configuration loading and validation failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid checkout configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),
}

impl ConfigError {
    /// Returns true if the file itself could not be read or parsed.
    pub fn is_io_error(&self) -> bool {
        matches!(
            self,
            ConfigError::ConfigLoadFailed(_) | ConfigError::ConfigSaveFailed(_)
        )
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for ConfigError {
    fn from(err: toml::ser::Error) -> Self {
        ConfigError::ConfigSaveFailed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(CarrierError::Timeout(10_000).is_retryable());
        assert!(CarrierError::Transport("connection refused".into()).is_retryable());
        assert!(CarrierError::Status {
            status: 503,
            body: String::new()
        }
        .is_retryable());

        assert!(!CarrierError::Status {
            status: 404,
            body: String::new()
        }
        .is_retryable());
        assert!(!CarrierError::MalformedResponse("missing field".into()).is_retryable());
        assert!(!CarrierError::UnknownProduct("p-9".into()).is_retryable());
    }

    #[test]
    fn test_redemption_retry_classification() {
        let busy = CouponUsageError::Store(StoreError::Database(DbError::Busy(
            "database is locked".into(),
        )));
        assert!(busy.is_retryable());

        let taken = CouponUsageError::AlreadyRedeemed {
            coupon_id: "coupon-welcome5".into(),
        };
        assert!(!taken.is_retryable());
        assert!(!CouponUsageError::CouponNotFound("nope".into()).is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err = CouponUsageError::AlreadyRedeemed {
            coupon_id: "coupon-welcome5".into(),
        };
        assert!(err.to_string().contains("coupon-welcome5"));

        let err = PricingError::from(ValidationError::EmptyCart);
        assert_eq!(err.to_string(), ValidationError::EmptyCart.to_string());
    }

    #[test]
    fn test_toml_error_is_load_failure() {
        let err: ConfigError = toml::from_str::<toml::Value>("not = [valid")
            .unwrap_err()
            .into();
        assert!(err.is_io_error());
    }
}
