//! # Order Totals
//!
//! The fixed formula that combines shipping, tax and discount.
//!
//! ```text
//! taxable_amount = max(0, subtotal - discount)
//! final_total    = taxable_amount + shipping + tax
//! ```
//!
//! Tax was already computed on the pre-discount subtotal (plus shipping
//! where taxable). The discount reduces the principal only.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::coupon::CouponValidation;
use crate::money::Money;
use crate::shipping::ShippingQuote;
use crate::tax::TaxResult;

/// The four headline amounts and what they combine to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderTotals {
    pub subtotal: Money,
    pub shipping: Money,
    pub tax: Money,
    pub discount: Money,
    pub taxable_amount: Money,
    pub final_total: Money,
}

impl OrderTotals {
    /// Applies the order total formula.
    ///
    /// ## Example
    /// ```rust
    /// use checkout_core::money::Money;
    /// use checkout_core::totals::OrderTotals;
    ///
    /// let totals = OrderTotals::combine(
    ///     Money::from_cents(10000),
    ///     Money::from_cents(1000),
    ///     Money::from_cents(800),
    ///     Money::from_cents(2000),
    /// );
    /// assert_eq!(totals.taxable_amount.cents(), 8000);
    /// assert_eq!(totals.final_total.cents(), 9800);
    /// ```
    pub fn combine(subtotal: Money, shipping: Money, tax: Money, discount: Money) -> Self {
        let taxable_amount = (subtotal - discount).clamp_non_negative();
        OrderTotals {
            subtotal,
            shipping,
            tax,
            discount,
            taxable_amount,
            final_total: taxable_amount + shipping + tax,
        }
    }
}

/// Full result of a total calculation.
///
/// Always fully populated; a calculation either returns one of these or
/// a validation error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PricingBreakdown {
    pub subtotal: Money,
    pub shipping: Money,
    pub tax: Money,
    pub discount: Money,
    pub final_total: Money,
    pub taxable_amount: Money,
    pub shipping_detail: ShippingQuote,
    pub tax_detail: TaxResult,
    /// `None` when no coupon code was submitted.
    pub coupon_detail: Option<CouponValidation>,
}

impl PricingBreakdown {
    /// Combines component results. Shipping is the quote's charge, the
    /// same value tax was computed against.
    pub fn assemble(
        subtotal: Money,
        shipping_detail: ShippingQuote,
        tax_detail: TaxResult,
        coupon_detail: Option<CouponValidation>,
    ) -> Self {
        let discount = coupon_detail
            .as_ref()
            .map(CouponValidation::amount)
            .unwrap_or_default();
        let totals = OrderTotals::combine(
            subtotal,
            shipping_detail.shipping_charge,
            tax_detail.tax_amount,
            discount,
        );

        PricingBreakdown {
            subtotal: totals.subtotal,
            shipping: totals.shipping,
            tax: totals.tax,
            discount: totals.discount,
            final_total: totals.final_total,
            taxable_amount: totals.taxable_amount,
            shipping_detail,
            tax_detail,
            coupon_detail,
        }
    }

    pub fn totals(&self) -> OrderTotals {
        OrderTotals {
            subtotal: self.subtotal,
            shipping: self.shipping,
            tax: self.tax,
            discount: self.discount,
            taxable_amount: self.taxable_amount,
            final_total: self.final_total,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
