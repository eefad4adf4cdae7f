//! # Validation Module
//!
//! Boundary validation for pricing requests.
//!
//! ## Where Validation Happens
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Request Boundary                                   │
//! │                                                                         │
//! │  Storefront request                                                     │
//! │  ├── cart lines, address, coupon code                                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  THIS MODULE (once, up front)                                           │
//! │  ├── empty cart?            → ValidationError::EmptyCart               │
//! │  ├── quantity 1..=999?      → ValidationError::OutOfRange              │
//! │  ├── price 0..=1,000,000?   → ValidationError::OutOfRange              │
//! │  └── country code AA?       → ValidationError::InvalidFormat           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Shipping / Tax / Coupon run on trusted input and never fail           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use checkout_core::validation::{validate_country_code, validate_quantity};
//!
//! assert_eq!(validate_country_code(" us ").unwrap(), "US");
//! assert!(validate_quantity(1000).is_err());
//! ```

use crate::error::ValidationError;
use crate::types::{CartLine, CartLineRequest, ShippingAddress};
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY, MAX_UNIT_PRICE_CENTS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Scalar Validators
// =============================================================================

/// Validates an item quantity.
///
/// ## Rules
/// - Must be positive
/// - Must not exceed [`MAX_ITEM_QUANTITY`] (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a unit price in cents.
///
/// Zero is allowed (free items); the ceiling is [`MAX_UNIT_PRICE_CENTS`].
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if !(0..=MAX_UNIT_PRICE_CENTS).contains(&cents) {
        return Err(ValidationError::OutOfRange {
            field: "unit_price".to_string(),
            min: 0,
            max: MAX_UNIT_PRICE_CENTS,
        });
    }

    Ok(())
}

/// Validates and normalises an ISO-3166 alpha-2 country code.
///
/// Returns the upper-case code.
pub fn validate_country_code(code: &str) -> ValidationResult<String> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::required("country_code"));
    }

    if code.len() != 2 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ValidationError::invalid_format(
            "country_code",
            "must be a two-letter ISO-3166 code",
        ));
    }

    Ok(code.to_ascii_uppercase())
}

/// Validates a whole-number tax percentage (0..=100).
pub fn validate_tax_rate_percent(rate: f64) -> ValidationResult<()> {
    if !rate.is_finite() || !(0.0..=100.0).contains(&rate) {
        return Err(ValidationError::OutOfRange {
            field: "tax_rate".to_string(),
            min: 0,
            max: 100,
        });
    }

    Ok(())
}

fn require_id(value: &str, field: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::required(field));
    }
    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

fn validate_line_count(count: usize) -> ValidationResult<()> {
    if count == 0 {
        return Err(ValidationError::EmptyCart);
    }

    if count > MAX_CART_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "cart lines".to_string(),
            min: 1,
            max: MAX_CART_ITEMS as i64,
        });
    }

    Ok(())
}

/// Validates priced cart lines before a total calculation.
///
/// ## Rules
/// - At least one line, at most [`MAX_CART_ITEMS`]
/// - Every line has a product and variant id
/// - Quantity in 1..=999, unit price >= 0
pub fn validate_cart_lines(lines: &[CartLine]) -> ValidationResult<()> {
    validate_line_count(lines.len())?;

    for line in lines {
        require_id(&line.product_id, "product_id")?;
        require_id(&line.variant_id, "variant_id")?;
        validate_quantity(line.quantity)?;
        validate_price_cents(line.unit_price.cents())?;
    }

    Ok(())
}

/// Validates raw client cart lines before product lookup.
pub fn validate_cart_requests(requests: &[CartLineRequest]) -> ValidationResult<()> {
    validate_line_count(requests.len())?;

    for request in requests {
        require_id(&request.product_id, "product_id")?;
        require_id(&request.variant_id, "variant_id")?;
        validate_quantity(request.quantity)?;
    }

    Ok(())
}

/// Validates a shipping address and returns a normalised copy.
///
/// Country and region codes come back upper case; a blank region becomes `None`.
pub fn validate_address(address: &ShippingAddress) -> ValidationResult<ShippingAddress> {
    let country_code = validate_country_code(&address.country_code)?;
    let region_code = address
        .region_code
        .as_deref()
        .map(|r| r.trim().to_ascii_uppercase())
        .filter(|r| !r.is_empty());

    Ok(ShippingAddress {
        country_code,
        region_code,
        city: address.city.trim().to_string(),
        postal_code: address.postal_code.trim().to_string(),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
