//! # Shipping Resolver
//!
//! Resolves one shipping cost per cart line, then hands the lines to
//! [`checkout_core::shipping::build_quote`] for the cart-level rules.
//!
//! ## Per-Line Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  cache.get(key, now) ── fresh hit ──────────────────────► Cached        │
//! │        │ miss / error                                                   │
//! │        ▼                                                                │
//! │  products.get_product ── missing / error ──┐                            │
//! │        │                                   │                            │
//! │        ▼                                   │                            │
//! │  carrier.quote_shipping (bounded) ─ error ─┴──► StaticFallback (warn!)  │
//! │        │ ok                                                             │
//! │        ▼                                                                │
//! │  cache.put (best effort) ───────────────────────────────► Live          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Lines are resolved concurrently. Nothing here returns an error.
//!
//! Quotes outside the accepted cost range count as carrier errors. Every
//! `cache_purge_every_writes` successful cache writes, expired entries are
//! purged from the cache.

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use checkout_core::shipping::build_quote;
use checkout_core::{
    cart_subtotal, CartLine, FallbackRateTable, LineShippingCost, RateSource, ShippingPolicy,
    ShippingQuote, ShippingRateCacheEntry, ShippingRateKey,
};

use crate::clock::Clock;
use crate::collaborators::{CarrierQuote, CarrierRateProvider, ProductLookup, ShippingRateCache};
use crate::config::CheckoutConfig;
use crate::error::CarrierError;

pub struct ShippingResolver {
    products: Arc<dyn ProductLookup>,
    carrier: Arc<dyn CarrierRateProvider>,
    cache: Arc<dyn ShippingRateCache>,
    clock: Arc<dyn Clock>,
    fallback: FallbackRateTable,
    policy: ShippingPolicy,
    cache_ttl: chrono::Duration,
    carrier_timeout: Duration,
    purge_every: u64,
    writes: AtomicU64,
}

impl ShippingResolver {
    pub fn new(
        products: Arc<dyn ProductLookup>,
        carrier: Arc<dyn CarrierRateProvider>,
        cache: Arc<dyn ShippingRateCache>,
        clock: Arc<dyn Clock>,
        config: &CheckoutConfig,
    ) -> Self {
        ShippingResolver {
            products,
            carrier,
            cache,
            clock,
            fallback: config.fallback_rate_table(),
            policy: config.shipping_policy(),
            cache_ttl: config.cache_ttl(),
            carrier_timeout: config.carrier.timeout(),
            purge_every: config.shipping.cache_purge_every_writes.max(1),
            writes: AtomicU64::new(0),
        }
    }

    pub fn policy(&self) -> &ShippingPolicy {
        &self.policy
    }

    /// Prices shipping for the cart. Always returns a quote.
    pub async fn resolve_shipping(
        &self,
        lines: &[CartLine],
        country_code: &str,
        region_code: Option<&str>,
    ) -> ShippingQuote {
        let subtotal = cart_subtotal(lines);

        let per_line_costs = join_all(
            lines
                .iter()
                .map(|line| self.resolve_line(line, country_code, region_code)),
        )
        .await;

        let quote = build_quote(subtotal, per_line_costs, &self.policy);

        if quote.is_emergency {
            warn!(
                country = %country_code,
                lines = lines.len(),
                flat_rate_cents = quote.total_cost.cents(),
                "Carrier unreachable for every line, charging emergency flat rate"
            );
        }

        quote
    }

    async fn resolve_line(
        &self,
        line: &CartLine,
        country_code: &str,
        region_code: Option<&str>,
    ) -> LineShippingCost {
        let key = ShippingRateKey::new(
            line.product_id.as_str(),
            line.variant_id.as_str(),
            country_code,
            region_code,
        );
        let now = self.clock.now();

        match self.cache.get(&key, now).await {
            Ok(Some(entry)) => {
                debug!(
                    product_id = %key.product_id,
                    country = %key.country_code,
                    "Shipping rate cache hit"
                );
                return LineShippingCost::from_carrier(
                    line,
                    entry.cost,
                    entry.delivery_estimate,
                    RateSource::Cached,
                );
            }
            Ok(None) => {}
            Err(e) => warn!(
                product_id = %key.product_id,
                error = %e,
                "Shipping rate cache read failed"
            ),
        }

        match self.fetch_live(line, &key).await {
            Ok(quote) => {
                self.remember(key, quote, now).await;
                LineShippingCost::from_carrier(
                    line,
                    quote.cost(),
                    quote.estimated_days,
                    RateSource::Live,
                )
            }
            Err(e) => {
                warn!(
                    product_id = %key.product_id,
                    variant_id = %key.variant_id,
                    country = %key.country_code,
                    region = ?key.region_code,
                    retryable = e.is_retryable(),
                    error = %e,
                    "Carrier quote failed, using static fallback rate"
                );
                LineShippingCost::from_fallback(line, &self.fallback.rate_for(&key.country_code))
            }
        }
    }

    async fn fetch_live(
        &self,
        line: &CartLine,
        key: &ShippingRateKey,
    ) -> Result<CarrierQuote, CarrierError> {
        let product = match self.products.get_product(&line.product_id).await {
            Ok(Some(product)) => product,
            Ok(None) => return Err(CarrierError::UnknownProduct(line.product_id.clone())),
            Err(e) => {
                return Err(CarrierError::UnknownProduct(format!(
                    "{} (catalogue error: {e})",
                    line.product_id
                )))
            }
        };

        let call = self.carrier.quote_shipping(
            &product.carrier_product_ref,
            &line.variant_id,
            &key.country_code,
            key.region_code.as_deref(),
        );

        let quote = match tokio::time::timeout(self.carrier_timeout, call).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(CarrierError::Timeout(
                    u64::try_from(self.carrier_timeout.as_millis()).unwrap_or(u64::MAX),
                ))
            }
        };

        let quote = quote.checked()?;
        if quote.cost().checked_multiply_quantity(line.quantity).is_none() {
            return Err(CarrierError::MalformedResponse(format!(
                "cost_minor_units {} overflows for quantity {}",
                quote.cost_minor_units, line.quantity
            )));
        }
        Ok(quote)
    }

    async fn remember(&self, key: ShippingRateKey, quote: CarrierQuote, now: DateTime<Utc>) {
        let Some(expires_at) = now.checked_add_signed(self.cache_ttl) else {
            warn!(product_id = %key.product_id, "Cache expiry out of range, not caching rate");
            return;
        };
        let entry = ShippingRateCacheEntry {
            key,
            cost: quote.cost(),
            delivery_estimate: quote.estimated_days,
            expires_at,
        };
        let product_id = entry.key.product_id.clone();

        if let Err(e) = self.cache.put(entry).await {
            warn!(product_id = %product_id, error = %e, "Failed to cache shipping rate");
            return;
        }

        let writes = self.writes.fetch_add(1, Ordering::Relaxed) + 1;
        if writes % self.purge_every == 0 {
            match self.cache.purge_expired(now).await {
                Ok(removed) => debug!(removed, "Purged expired shipping rates"),
                Err(e) => warn!(error = %e, "Failed to purge expired shipping rates"),
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
