//! # Pricing Engine
//!
//! The upward surface of the crate: one call turns a cart and an address
//! into a [`PricingBreakdown`].
//!
//! ## Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   calculate_order_totals                                │
//! │                                                                         │
//! │  validate lines + address ──── ValidationError ──► Err (nothing priced) │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  subtotal = Σ unit_price × quantity                                     │
//! │        │                                                                │
//! │        ├──────────────────────────┬───────────────────────┐             │
//! │        ▼                          ▼                       │ concurrent  │
//! │  ShippingResolver          CouponEngine                   │             │
//! │  (never fails)             (invalid → data)               │             │
//! │        │                          │                       │             │
//! │        ▼                          │                                     │
//! │  TaxCalculator on subtotal        │                                     │
//! │  + shipping_charge                │                                     │
//! │        │                          │                                     │
//! │        └────────────┬─────────────┘                                     │
//! │                     ▼                                                   │
//! │  taxable_amount = max(0, subtotal - discount)                           │
//! │  final_total    = taxable_amount + shipping + tax                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Tax is computed on the pre-discount subtotal; the discount only reduces
//! the principal.

use futures_util::future::join_all;
use std::sync::Arc;
use tracing::info;

use checkout_core::validation::{validate_address, validate_cart_lines, validate_cart_requests};
use checkout_core::{
    cart_subtotal, CartLine, CartLineRequest, CouponUsageRecord, CouponValidation, Money,
    PricingBreakdown, ShippingAddress, TaxConfigValidation, ValidationError,
};
use checkout_db::Database;

use crate::cache::InMemoryRateCache;
use crate::carrier::HttpCarrierClient;
use crate::clock::{Clock, SystemClock};
use crate::collaborators::{
    CarrierRateProvider, CouponStore, ProductLookup, ShippingRateCache, TaxConfigStore,
};
use crate::config::{CacheBackend, CheckoutConfig};
use crate::coupon::CouponEngine;
use crate::error::{ConfigError, CouponUsageError, PricingError, StoreError};
use crate::shipping::ShippingResolver;
use crate::tax::TaxCalculator;

/// Everything the engine talks to.
pub struct Collaborators {
    pub products: Arc<dyn ProductLookup>,
    pub carrier: Arc<dyn CarrierRateProvider>,
    pub rate_cache: Arc<dyn ShippingRateCache>,
    pub tax_configs: Arc<dyn TaxConfigStore>,
    pub coupons: Arc<dyn CouponStore>,
    pub clock: Arc<dyn Clock>,
}

impl Collaborators {
    /// SQLite stores, the HTTP carrier client and the wall clock.
    pub fn from_database(config: &CheckoutConfig, db: &Database) -> Result<Self, ConfigError> {
        let rate_cache: Arc<dyn ShippingRateCache> = match config.shipping.cache_backend {
            CacheBackend::Database => Arc::new(db.shipping_cache()),
            CacheBackend::Memory => Arc::new(InMemoryRateCache::new()),
        };

        Ok(Collaborators {
            products: Arc::new(db.products()),
            carrier: Arc::new(HttpCarrierClient::from_settings(&config.carrier)?),
            rate_cache,
            tax_configs: Arc::new(db.tax_configs()),
            coupons: Arc::new(db.coupons()),
            clock: Arc::new(SystemClock),
        })
    }
}

pub struct PricingEngine {
    products: Arc<dyn ProductLookup>,
    shipping: ShippingResolver,
    tax: TaxCalculator,
    coupons: CouponEngine,
}

impl PricingEngine {
    pub fn new(config: &CheckoutConfig, deps: Collaborators) -> Self {
        PricingEngine {
            shipping: ShippingResolver::new(
                deps.products.clone(),
                deps.carrier,
                deps.rate_cache,
                deps.clock.clone(),
                config,
            ),
            tax: TaxCalculator::new(deps.tax_configs, config.tax_policy()),
            coupons: CouponEngine::new(deps.coupons, deps.clock),
            products: deps.products,
        }
    }

    pub fn from_database(config: &CheckoutConfig, db: &Database) -> Result<Self, ConfigError> {
        Ok(Self::new(config, Collaborators::from_database(config, db)?))
    }

    pub fn shipping(&self) -> &ShippingResolver {
        &self.shipping
    }

    pub fn tax(&self) -> &TaxCalculator {
        &self.tax
    }

    pub fn coupons(&self) -> &CouponEngine {
        &self.coupons
    }

    // =========================================================================
    // Order totals
    // =========================================================================

    /// Prices a cart for a destination.
    ///
    /// ## Errors
    /// Only [`PricingError::Validation`]: empty cart, bad line, bad country.
    /// Carrier, tax and coupon problems degrade inside the breakdown.
    pub async fn calculate_order_totals(
        &self,
        lines: &[CartLine],
        address: &ShippingAddress,
        coupon_code: Option<&str>,
        user_id: Option<&str>,
    ) -> Result<PricingBreakdown, PricingError> {
        validate_cart_lines(lines)?;
        let address = validate_address(address)?;

        let subtotal = cart_subtotal(lines);
        let coupon_code = coupon_code.map(str::trim).filter(|c| !c.is_empty());

        let coupon_check = async {
            match coupon_code {
                Some(code) => Some(
                    self.coupons
                        .validate_coupon(code, user_id, lines, subtotal)
                        .await,
                ),
                None => None,
            }
        };

        let (shipping, coupon) = tokio::join!(
            self.shipping.resolve_shipping(
                lines,
                &address.country_code,
                address.region_code.as_deref()
            ),
            coupon_check,
        );

        let tax = self
            .tax
            .calculate_tax(subtotal, shipping.shipping_charge, &address.country_code)
            .await;

        let breakdown = PricingBreakdown::assemble(subtotal, shipping, tax, coupon);

        info!(
            country = %address.country_code,
            lines = lines.len(),
            subtotal_cents = breakdown.subtotal.cents(),
            shipping_cents = breakdown.shipping.cents(),
            tax_cents = breakdown.tax.cents(),
            discount_cents = breakdown.discount.cents(),
            final_total_cents = breakdown.final_total.cents(),
            shipping_tier = ?breakdown.shipping_detail.tier,
            tax_source = ?breakdown.tax_detail.source,
            coupon_valid = breakdown.coupon_detail.as_ref().map(|c| c.is_valid),
            "Order totals calculated"
        );

        Ok(breakdown)
    }

    /// Same pipeline without a user identity, so single-use coupons are
    /// not checked against redemption history.
    pub async fn quick_calculate(
        &self,
        lines: &[CartLine],
        address: &ShippingAddress,
        coupon_code: Option<&str>,
    ) -> Result<PricingBreakdown, PricingError> {
        self.calculate_order_totals(lines, address, coupon_code, None)
            .await
    }

    /// Re-prices raw client lines from the catalogue.
    ///
    /// Unknown or inactive products are a validation error. Catalogue
    /// outages fail with [`PricingError::CatalogueUnavailable`].
    pub async fn build_cart_lines(
        &self,
        requests: &[CartLineRequest],
    ) -> Result<Vec<CartLine>, PricingError> {
        validate_cart_requests(requests)?;

        let lookups = join_all(
            requests
                .iter()
                .map(|request| self.products.get_product(&request.product_id)),
        )
        .await;

        requests
            .iter()
            .zip(lookups)
            .map(|(request, lookup)| -> Result<CartLine, PricingError> {
                let product = lookup?.ok_or_else(|| ValidationError::UnknownProduct {
                    product_id: request.product_id.clone(),
                })?;

                Ok(CartLine::new(
                    request.product_id.clone(),
                    request.variant_id.clone(),
                    request.quantity,
                    product.base_price,
                    product.category,
                ))
            })
            .collect()
    }

    // =========================================================================
    // Coupons and tax configuration
    // =========================================================================

    pub async fn validate_coupon(
        &self,
        code: &str,
        user_id: Option<&str>,
        lines: &[CartLine],
    ) -> CouponValidation {
        self.coupons
            .validate_coupon(code, user_id, lines, cart_subtotal(lines))
            .await
    }

    /// Records a redemption. Call only after the order is confirmed.
    pub async fn mark_coupon_used(
        &self,
        coupon_id: &str,
        user_id: Option<&str>,
        order_id: &str,
        discount_amount: Money,
    ) -> Result<CouponUsageRecord, CouponUsageError> {
        self.coupons
            .mark_used(coupon_id, user_id, order_id, discount_amount)
            .await
    }

    pub async fn coupon_usage_history(
        &self,
        coupon_id: &str,
    ) -> Result<Vec<CouponUsageRecord>, StoreError> {
        self.coupons.usage_history(coupon_id).await
    }

    pub async fn validate_tax_configuration(&self) -> TaxConfigValidation {
        self.tax.validate_configuration().await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
