//! # Coupon Engine
//!
//! Store-backed side of coupon handling. Eligibility and discount math are
//! pure functions in [`checkout_core::coupon`]; this module adds the lookup,
//! the per-user redemption check and the confirmed-order write.
//!
//! Validation never fails: store problems produce an invalid result with
//! "Unable to validate coupon right now" so pricing can continue.

use std::sync::Arc;
use tracing::{debug, info, warn};

use checkout_core::coupon::{check_eligibility, compute_discount};
use checkout_core::{
    normalize_coupon_code, CartLine, CouponDiscount, CouponRejection, CouponUsageRecord,
    CouponValidation, Money,
};

use crate::clock::Clock;
use crate::collaborators::CouponStore;
use crate::error::{CouponUsageError, StoreError};

pub struct CouponEngine {
    store: Arc<dyn CouponStore>,
    clock: Arc<dyn Clock>,
}

impl CouponEngine {
    pub fn new(store: Arc<dyn CouponStore>, clock: Arc<dyn Clock>) -> Self {
        CouponEngine { store, clock }
    }

    /// Runs the coupon checks in order and computes the discount.
    ///
    /// `subtotal` is the full cart subtotal (minimum order check); the
    /// discount itself only applies to the lines the coupon covers.
    pub async fn validate_coupon(
        &self,
        code: &str,
        user_id: Option<&str>,
        lines: &[CartLine],
        subtotal: Money,
    ) -> CouponValidation {
        let result = self.evaluate(code, user_id, lines, subtotal).await;

        if let Err(reason) = &result {
            debug!(code = %code, reason = %reason, "Coupon rejected");
        }

        CouponValidation::from(result)
    }

    async fn evaluate(
        &self,
        code: &str,
        user_id: Option<&str>,
        lines: &[CartLine],
        subtotal: Money,
    ) -> Result<CouponDiscount, CouponRejection> {
        let code = normalize_coupon_code(code);
        if code.is_empty() {
            return Err(CouponRejection::NotFound);
        }

        let coupon = self
            .store
            .find_by_code(&code)
            .await
            .map_err(|e| unavailable(&code, e))?
            .ok_or(CouponRejection::NotFound)?;

        check_eligibility(&coupon, subtotal, self.clock.now())?;

        if coupon.is_single_use {
            if let Some(user_id) = user_id {
                let already_used = self
                    .store
                    .has_user_used(&coupon.id, user_id)
                    .await
                    .map_err(|e| unavailable(&code, e))?;

                if already_used {
                    return Err(CouponRejection::AlreadyUsed);
                }
            }
        }

        compute_discount(&coupon, lines)
    }

    /// Records a redemption for a confirmed order.
    pub async fn mark_used(
        &self,
        coupon_id: &str,
        user_id: Option<&str>,
        order_id: &str,
        discount_amount: Money,
    ) -> Result<CouponUsageRecord, CouponUsageError> {
        match self
            .store
            .record_usage(coupon_id, user_id, order_id, discount_amount)
            .await
        {
            Ok(record) => {
                info!(
                    coupon_id = %coupon_id,
                    order_id = %order_id,
                    discount_cents = discount_amount.cents(),
                    "Coupon marked as used"
                );
                Ok(record)
            }
            Err(e) => {
                warn!(
                    coupon_id = %coupon_id,
                    order_id = %order_id,
                    error = %e,
                    retryable = e.is_retryable(),
                    "Coupon redemption refused"
                );
                Err(e)
            }
        }
    }

    pub async fn usage_history(
        &self,
        coupon_id: &str,
    ) -> Result<Vec<CouponUsageRecord>, StoreError> {
        self.store.usage_history(coupon_id).await
    }
}

fn unavailable(code: &str, err: StoreError) -> CouponRejection {
    warn!(code = %code, error = %err, "Coupon store unavailable");
    CouponRejection::Unavailable
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::testing::{start, FakeCouponStore};
    use checkout_core::{ApplicableTo, Coupon, DiscountType};
    use chrono::Duration;

    fn coupon(code: &str, discount_type: DiscountType, value: f64) -> Coupon {
        Coupon {
            id: format!("coupon-{}", code.to_lowercase()),
            code: code.to_string(),
            discount_type,
            discount_value: value,
            min_order_amount: None,
            max_discount_amount: None,
            usage_limit: None,
            used_count: 0,
            is_single_use: false,
            valid_from: start() - Duration::days(1),
            valid_until: None,
            applicable_to: ApplicableTo::AllProducts,
            categories: vec![],
            products: vec![],
            is_active: true,
        }
    }

    fn engine(store: FakeCouponStore) -> CouponEngine {
        CouponEngine::new(Arc::new(store), Arc::new(ManualClock::new(start())))
    }

    fn cart() -> Vec<CartLine> {
        vec![
            CartLine::new("1", "v1", 2, Money::from_cents(3000), "shirts"),
            CartLine::new("9", "v1", 1, Money::from_cents(4000), "mugs"),
        ]
    }

    #[tokio::test]
    async fn test_percentage_with_cap() {
        let mut half = coupon("HALF", DiscountType::Percentage, 50.0);
        half.max_discount_amount = Some(Money::from_cents(1000));
        let engine = engine(FakeCouponStore::with(vec![half]));

        let result = engine
            .validate_coupon("  half ", None, &cart(), Money::from_cents(10_000))
            .await;

        assert!(result.is_valid);
        assert_eq!(result.amount().cents(), 1000);
    }

    #[tokio::test]
    async fn test_category_coupon_discounts_matching_lines_only() {
        let mut mugs = coupon("MUGS20", DiscountType::Percentage, 20.0);
        mugs.applicable_to = ApplicableTo::CategorySpecific;
        mugs.categories = vec!["Mugs".to_string()];
        let engine = engine(FakeCouponStore::with(vec![mugs]));

        let result = engine
            .validate_coupon("MUGS20", None, &cart(), Money::from_cents(10_000))
            .await;
        let discount = result.discount.unwrap();

        assert_eq!(discount.applicable_subtotal.cents(), 4000);
        assert_eq!(discount.amount.cents(), 800);
    }

    #[tokio::test]
    async fn test_rejections_have_distinct_messages() {
        let mut expired = coupon("OLD", DiscountType::FixedAmount, 500.0);
        expired.valid_until = Some(start() - Duration::hours(1));
        let mut minimum = coupon("BIG", DiscountType::FixedAmount, 500.0);
        minimum.min_order_amount = Some(Money::from_cents(20_000));
        let mut other = coupon("OTHER", DiscountType::FixedAmount, 500.0);
        other.applicable_to = ApplicableTo::ProductSpecific;
        other.products = vec!["42".to_string()];

        let engine = engine(FakeCouponStore::with(vec![expired, minimum, other]));
        let subtotal = Money::from_cents(10_000);

        let error = |v: CouponValidation| v.error.unwrap();
        assert_eq!(
            error(engine.validate_coupon("NOPE", None, &cart(), subtotal).await),
            "Invalid coupon code"
        );
        assert_eq!(
            error(engine.validate_coupon("OLD", None, &cart(), subtotal).await),
            "This coupon has expired"
        );
        assert_eq!(
            error(engine.validate_coupon("BIG", None, &cart(), subtotal).await),
            "Minimum order amount of $200.00 required"
        );
        assert_eq!(
            error(engine.validate_coupon("OTHER", None, &cart(), subtotal).await),
            "Coupon doesn't apply to any items in cart"
        );
    }

    #[tokio::test]
    async fn test_single_use_checked_per_user() {
        let mut welcome = coupon("WELCOME5", DiscountType::FixedAmount, 500.0);
        welcome.is_single_use = true;
        let engine = engine(FakeCouponStore::with(vec![welcome]));
        let subtotal = Money::from_cents(10_000);

        engine
            .mark_used("coupon-welcome5", Some("user-1"), "order-1", Money::from_cents(500))
            .await
            .unwrap();

        let again = engine
            .validate_coupon("WELCOME5", Some("user-1"), &cart(), subtotal)
            .await;
        assert_eq!(again.error.as_deref(), Some("You have already used this coupon"));

        let other_user = engine
            .validate_coupon("WELCOME5", Some("user-2"), &cart(), subtotal)
            .await;
        assert!(other_user.is_valid);

        // Without a user identity the per-user check is skipped.
        let anonymous = engine.validate_coupon("WELCOME5", None, &cart(), subtotal).await;
        assert!(anonymous.is_valid);
    }

    #[tokio::test]
    async fn test_store_outage_is_reported_not_raised() {
        let store = FakeCouponStore {
            unavailable: true,
            ..FakeCouponStore::default()
        };
        let engine = engine(store);

        let result = engine
            .validate_coupon("SAVE10", None, &cart(), Money::from_cents(10_000))
            .await;
        assert!(!result.is_valid);
        assert_eq!(result.error.as_deref(), Some("Unable to validate coupon right now"));
    }
}
