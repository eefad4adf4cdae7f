//! # Coupon Rules
//!
//! Eligibility checks and discount math for coupons. Lookups and usage
//! history live in the engine; everything here is a pure function of the
//! coupon, the cart and the current time.
//!
//! ## Check Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. exists and active         → "Invalid coupon code" / "no longer ..." │
//! │  2. now in validity window    → "not yet valid" / "has expired"         │
//! │  3. used_count < usage_limit  → "reached its usage limit"               │
//! │  4. subtotal >= min order     → "Minimum order amount of $X required"   │
//! │  5. single use, user known    → "You have already used this coupon"     │
//! │  6. applicable lines exist    → "doesn't apply to any items in cart"    │
//! │                                                                         │
//! │  The first failing check wins.                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

use crate::money::Money;
use crate::types::{ApplicableTo, CartLine, Coupon, DiscountType};

// =============================================================================
// Rejections
// =============================================================================

/// Why a coupon cannot be applied. The display text is shown to shoppers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CouponRejection {
    #[error("Invalid coupon code")]
    NotFound,

    #[error("This coupon is no longer active")]
    Inactive,

    #[error("This coupon is not yet valid")]
    NotYetValid,

    #[error("This coupon has expired")]
    Expired,

    #[error("This coupon has reached its usage limit")]
    UsageLimitReached,

    #[error("Minimum order amount of {minimum} required")]
    BelowMinimum { minimum: Money },

    #[error("You have already used this coupon")]
    AlreadyUsed,

    #[error("Coupon doesn't apply to any items in cart")]
    NotApplicable,

    /// The coupon store could not be reached.
    #[error("Unable to validate coupon right now")]
    Unavailable,
}

// =============================================================================
// Results
// =============================================================================

/// A computed discount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CouponDiscount {
    pub coupon_id: String,
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: f64,
    /// Value of the cart lines the coupon may discount.
    pub applicable_subtotal: Money,
    /// Final discount, within `[0, applicable_subtotal]`.
    pub amount: Money,
}

/// Outcome of coupon validation. Invalid coupons are data, not errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CouponValidation {
    pub is_valid: bool,
    pub discount: Option<CouponDiscount>,
    pub error: Option<String>,
}

impl CouponValidation {
    pub fn valid(discount: CouponDiscount) -> Self {
        CouponValidation {
            is_valid: true,
            discount: Some(discount),
            error: None,
        }
    }

    pub fn rejected(reason: &CouponRejection) -> Self {
        CouponValidation {
            is_valid: false,
            discount: None,
            error: Some(reason.to_string()),
        }
    }

    /// Discount amount, zero when invalid.
    pub fn amount(&self) -> Money {
        self.discount
            .as_ref()
            .map(|d| d.amount)
            .unwrap_or_default()
    }
}

impl From<Result<CouponDiscount, CouponRejection>> for CouponValidation {
    fn from(result: Result<CouponDiscount, CouponRejection>) -> Self {
        match result {
            Ok(discount) => CouponValidation::valid(discount),
            Err(reason) => CouponValidation::rejected(&reason),
        }
    }
}

// =============================================================================
// Checks
// =============================================================================

/// Checks 1 to 4: status, validity window, usage cap, minimum order.
pub fn check_eligibility(
    coupon: &Coupon,
    subtotal: Money,
    now: DateTime<Utc>,
) -> Result<(), CouponRejection> {
    if !coupon.is_active {
        return Err(CouponRejection::Inactive);
    }

    if now < coupon.valid_from {
        return Err(CouponRejection::NotYetValid);
    }

    if coupon.valid_until.is_some_and(|until| now > until) {
        return Err(CouponRejection::Expired);
    }

    if coupon
        .usage_limit
        .is_some_and(|limit| coupon.used_count >= limit)
    {
        return Err(CouponRejection::UsageLimitReached);
    }

    if let Some(minimum) = coupon.min_order_amount {
        if subtotal < minimum {
            return Err(CouponRejection::BelowMinimum { minimum });
        }
    }

    Ok(())
}

/// Whether a coupon may discount a line.
pub fn applies_to_line(coupon: &Coupon, line: &CartLine) -> bool {
    match coupon.applicable_to {
        ApplicableTo::AllProducts => true,
        ApplicableTo::CategorySpecific => coupon
            .categories
            .iter()
            .any(|c| c.eq_ignore_ascii_case(&line.product_category)),
        ApplicableTo::ProductSpecific => coupon.products.iter().any(|p| p == &line.product_id),
    }
}

/// Sum of the lines a coupon may discount.
pub fn applicable_subtotal(coupon: &Coupon, lines: &[CartLine]) -> Money {
    lines
        .iter()
        .filter(|line| applies_to_line(coupon, line))
        .map(CartLine::line_total)
        .sum()
}

/// Check 6 plus the discount amount.
///
/// ## Amount Rules
/// - PERCENTAGE: `applicable × value / 100`, capped at `max_discount_amount`
/// - FIXED_AMOUNT: `min(value, applicable)`
/// - Always clamped to `[0, applicable]`
pub fn compute_discount(
    coupon: &Coupon,
    lines: &[CartLine],
) -> Result<CouponDiscount, CouponRejection> {
    let applicable = applicable_subtotal(coupon, lines);
    let has_applicable_lines = lines.iter().any(|line| applies_to_line(coupon, line));

    if !has_applicable_lines {
        return Err(CouponRejection::NotApplicable);
    }

    let raw = match coupon.discount_type {
        DiscountType::Percentage => {
            let amount = applicable.percentage(coupon.discount_value);
            match coupon.max_discount_amount {
                Some(cap) => amount.min(cap),
                None => amount,
            }
        }
        DiscountType::FixedAmount => {
            Money::from_major_rounded(coupon.discount_value / 100.0).min(applicable)
        }
    };

    Ok(CouponDiscount {
        coupon_id: coupon.id.clone(),
        code: coupon.code.clone(),
        discount_type: coupon.discount_type,
        discount_value: coupon.discount_value,
        applicable_subtotal: applicable,
        amount: raw.clamp_non_negative().min(applicable),
    })
}

/// Runs every check in order against an already fetched coupon.
///
/// `already_used` is the store's answer to "has this user redeemed it";
/// it only matters for single-use coupons.
pub fn evaluate_coupon(
    coupon: Option<&Coupon>,
    already_used: bool,
    lines: &[CartLine],
    subtotal: Money,
    now: DateTime<Utc>,
) -> Result<CouponDiscount, CouponRejection> {
    let coupon = coupon.ok_or(CouponRejection::NotFound)?;
    check_eligibility(coupon, subtotal, now)?;

    if coupon.is_single_use && already_used {
        return Err(CouponRejection::AlreadyUsed);
    }

    compute_discount(coupon, lines)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap()
    }

    fn coupon(discount_type: DiscountType, value: f64) -> Coupon {
        Coupon {
            id: "c-1".to_string(),
            code: "SAVE".to_string(),
            discount_type,
            discount_value: value,
            min_order_amount: None,
            max_discount_amount: None,
            usage_limit: None,
            used_count: 0,
            is_single_use: false,
            valid_from: now() - Duration::days(30),
            valid_until: None,
            applicable_to: ApplicableTo::AllProducts,
            categories: vec![],
            products: vec![],
            is_active: true,
        }
    }

    fn cart() -> Vec<CartLine> {
        vec![
            CartLine::new("p1", "v1", 2, Money::from_cents(3000), "shirts"),
            CartLine::new("p2", "v1", 1, Money::from_cents(4000), "mugs"),
        ]
    }

    fn eval(c: &Coupon, used: bool, lines: &[CartLine]) -> Result<CouponDiscount, CouponRejection> {
        let subtotal = crate::types::cart_subtotal(lines);
        evaluate_coupon(Some(c), used, lines, subtotal, now())
    }

    #[test]
    fn test_percentage_capped() {
        let mut c = coupon(DiscountType::Percentage, 50.0);
        c.max_discount_amount = Some(Money::from_cents(1000));
        let lines = vec![CartLine::new("p1", "v1", 1, Money::from_cents(10000), "shirts")];

        let discount = eval(&c, false, &lines).unwrap();
        assert_eq!(discount.amount.cents(), 1000);
        assert_eq!(discount.applicable_subtotal.cents(), 10000);
    }

    #[test]
    fn test_fixed_amount_never_exceeds_applicable() {
        let c = coupon(DiscountType::FixedAmount, 2500.0);
        assert_eq!(eval(&c, false, &cart()).unwrap().amount.cents(), 2500);

        let big = coupon(DiscountType::FixedAmount, 50_000.0);
        assert_eq!(eval(&big, false, &cart()).unwrap().amount.cents(), 10000);
    }

    #[test]
    fn test_category_specific_discounts_matching_lines_only() {
        let mut c = coupon(DiscountType::Percentage, 10.0);
        c.applicable_to = ApplicableTo::CategorySpecific;
        c.categories = vec!["Mugs".to_string()];

        let discount = eval(&c, false, &cart()).unwrap();
        assert_eq!(discount.applicable_subtotal.cents(), 4000);
        assert_eq!(discount.amount.cents(), 400);
    }

    #[test]
    fn test_product_specific_with_no_match() {
        let mut c = coupon(DiscountType::Percentage, 10.0);
        c.applicable_to = ApplicableTo::ProductSpecific;
        c.products = vec!["p9".to_string()];

        let err = eval(&c, false, &cart()).unwrap_err();
        assert_eq!(err, CouponRejection::NotApplicable);
        assert_eq!(err.to_string(), "Coupon doesn't apply to any items in cart");
    }

    #[test]
    fn test_missing_and_inactive() {
        let lines = cart();
        assert_eq!(
            evaluate_coupon(None, false, &lines, Money::from_cents(10000), now()),
            Err(CouponRejection::NotFound)
        );

        let mut c = coupon(DiscountType::Percentage, 10.0);
        c.is_active = false;
        assert_eq!(eval(&c, false, &lines), Err(CouponRejection::Inactive));
    }

    #[test]
    fn test_validity_window() {
        let mut early = coupon(DiscountType::Percentage, 10.0);
        early.valid_from = now() + Duration::days(1);
        assert_eq!(eval(&early, false, &cart()), Err(CouponRejection::NotYetValid));

        let mut expired = coupon(DiscountType::Percentage, 10.0);
        expired.valid_until = Some(now() - Duration::seconds(1));
        assert_eq!(eval(&expired, false, &cart()), Err(CouponRejection::Expired));

        let mut last_moment = coupon(DiscountType::Percentage, 10.0);
        last_moment.valid_until = Some(now());
        assert!(eval(&last_moment, false, &cart()).is_ok());
    }

    #[test]
    fn test_usage_limit() {
        let mut c = coupon(DiscountType::Percentage, 10.0);
        c.usage_limit = Some(5);
        c.used_count = 5;
        assert_eq!(eval(&c, false, &cart()), Err(CouponRejection::UsageLimitReached));

        c.used_count = 4;
        assert!(eval(&c, false, &cart()).is_ok());
    }

    #[test]
    fn test_minimum_order_message() {
        let mut c = coupon(DiscountType::Percentage, 10.0);
        c.min_order_amount = Some(Money::from_cents(20000));
        let err = eval(&c, false, &cart()).unwrap_err();
        assert_eq!(err.to_string(), "Minimum order amount of $200.00 required");
    }

    #[test]
    fn test_single_use_already_used() {
        let mut c = coupon(DiscountType::Percentage, 10.0);
        assert!(eval(&c, true, &cart()).is_ok());

        c.is_single_use = true;
        assert_eq!(eval(&c, true, &cart()), Err(CouponRejection::AlreadyUsed));
        assert!(eval(&c, false, &cart()).is_ok());
    }

    #[test]
    fn test_checks_short_circuit_in_order() {
        let mut c = coupon(DiscountType::Percentage, 10.0);
        c.valid_until = Some(now() - Duration::days(1));
        c.usage_limit = Some(1);
        c.used_count = 1;
        assert_eq!(eval(&c, false, &cart()), Err(CouponRejection::Expired));
    }

    #[test]
    fn test_validation_from_result() {
        let rejected: CouponValidation = Err(CouponRejection::Unavailable).into();
        assert!(!rejected.is_valid);
        assert_eq!(rejected.error.as_deref(), Some("Unable to validate coupon right now"));
        assert_eq!(rejected.amount(), Money::zero());
    }
}
