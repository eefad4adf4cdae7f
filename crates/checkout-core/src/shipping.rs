//! # Shipping Aggregation
//!
//! Pure cart-level shipping math. The engine resolves one cost per cart
//! line (live carrier, cache or static table) and hands the results here.
//!
//! ## Tiers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Shipping Resolution Tiers                          │
//! │                                                                         │
//! │  Tier 1: Live            every line priced by carrier or cache          │
//! │           │                                                             │
//! │           ▼ (some lines failed)                                         │
//! │  Tier 2: PartialFallback failed lines use static per-country rates      │
//! │           │                                                             │
//! │           ▼ (no line reached carrier or cache)                          │
//! │  Tier 3: EmergencyFlat   one flat charge for the whole cart             │
//! │                                                                         │
//! │  Free shipping threshold applies on top of every tier.                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::{round2, Money};
use crate::types::{CartLine, DeliveryEstimate};

// =============================================================================
// Per-Line Resolution
// =============================================================================

/// Where a line's shipping cost came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum RateSource {
    /// Fresh carrier quote made during this request.
    Live,
    /// Carrier quote served from the rate cache.
    Cached,
    /// Static per-country table; the carrier could not be used.
    StaticFallback,
}

impl RateSource {
    /// Live and cached rates both originate from the carrier.
    #[inline]
    pub fn is_carrier_backed(&self) -> bool {
        matches!(self, RateSource::Live | RateSource::Cached)
    }
}

/// Shipping cost for one cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineShippingCost {
    pub product_id: String,
    pub variant_id: String,
    pub quantity: i64,
    /// Cost for the whole line (per-unit rate × quantity).
    pub cost: Money,
    pub delivery: DeliveryEstimate,
    pub source: RateSource,
    pub used_fallback: bool,
}

impl LineShippingCost {
    /// Line priced from a per-unit carrier rate (live or cached).
    pub fn from_carrier(
        line: &CartLine,
        unit_cost: Money,
        delivery: DeliveryEstimate,
        source: RateSource,
    ) -> Self {
        LineShippingCost {
            product_id: line.product_id.clone(),
            variant_id: line.variant_id.clone(),
            quantity: line.quantity,
            cost: unit_cost.multiply_quantity(line.quantity),
            delivery,
            source,
            used_fallback: false,
        }
    }

    /// Line priced from the static fallback table.
    pub fn from_fallback(line: &CartLine, rate: &FallbackRate) -> Self {
        LineShippingCost {
            product_id: line.product_id.clone(),
            variant_id: line.variant_id.clone(),
            quantity: line.quantity,
            cost: rate.cost.multiply_quantity(line.quantity),
            delivery: rate.delivery,
            source: RateSource::StaticFallback,
            used_fallback: true,
        }
    }
}

// =============================================================================
// Static Fallback Table
// =============================================================================

/// A per-item static shipping rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackRate {
    pub cost: Money,
    pub delivery: DeliveryEstimate,
}

/// Country-keyed static rates with a mandatory default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackRateTable {
    rates: HashMap<String, FallbackRate>,
    default: FallbackRate,
}

impl FallbackRateTable {
    pub fn new(default: FallbackRate) -> Self {
        FallbackRateTable {
            rates: HashMap::new(),
            default,
        }
    }

    /// Adds or replaces a country rate. Codes are stored upper case.
    pub fn with_rate(mut self, country_code: &str, rate: FallbackRate) -> Self {
        self.rates.insert(country_code.trim().to_uppercase(), rate);
        self
    }

    /// Rate for a country, or the default.
    pub fn rate_for(&self, country_code: &str) -> FallbackRate {
        self.rates
            .get(&country_code.trim().to_uppercase())
            .copied()
            .unwrap_or(self.default)
    }

    pub fn default_rate(&self) -> FallbackRate {
        self.default
    }
}

// =============================================================================
// Cart-Level Quote
// =============================================================================

/// Which tier produced the cart's shipping total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum ShippingTier {
    Live,
    PartialFallback,
    EmergencyFlat,
}

/// Cart-level thresholds and emergency values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShippingPolicy {
    pub free_shipping_threshold: Money,
    pub emergency_flat_rate: Money,
    pub emergency_delivery: DeliveryEstimate,
}

impl Default for ShippingPolicy {
    fn default() -> Self {
        ShippingPolicy {
            free_shipping_threshold: Money::from_cents(
                crate::DEFAULT_FREE_SHIPPING_THRESHOLD_CENTS,
            ),
            emergency_flat_rate: Money::from_cents(crate::DEFAULT_EMERGENCY_FLAT_RATE_CENTS),
            emergency_delivery: DeliveryEstimate::new(7, 14),
        }
    }
}

/// The resolved shipping quote for a cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ShippingQuote {
    pub per_line_costs: Vec<LineShippingCost>,
    /// Cost before the free-shipping rule.
    pub total_cost: Money,
    /// What the customer pays. Used by tax and the order total.
    pub shipping_charge: Money,
    pub is_free_shipping_applied: bool,
    pub free_shipping_threshold: Money,
    pub amount_needed_for_free: Money,
    /// 0..=100, two decimals.
    pub progress_percent: f64,
    pub estimated_delivery_days: DeliveryEstimate,
    pub used_fallback: bool,
    pub is_emergency: bool,
    pub tier: ShippingTier,
}

/// Cart delivery window: the slowest line bounds both ends.
pub fn combine_delivery(lines: &[LineShippingCost]) -> Option<DeliveryEstimate> {
    let min_days = lines.iter().map(|l| l.delivery.min_days).max()?;
    let max_days = lines.iter().map(|l| l.delivery.max_days).max()?;
    Some(DeliveryEstimate::new(min_days, max_days.max(min_days)))
}

/// `min(100, subtotal / threshold × 100)`, rounded to two decimals.
///
/// A zero threshold means everything ships free, so progress is 100.
pub fn free_shipping_progress(subtotal: Money, threshold: Money) -> f64 {
    if !threshold.is_positive() {
        return 100.0;
    }
    let pct = subtotal.to_major() / threshold.to_major() * 100.0;
    round2(pct.clamp(0.0, 100.0))
}

/// Builds the cart quote from per-line results.
///
/// Never fails. When no line is carrier-backed the per-line fallbacks are
/// replaced by the emergency flat charge; the lines stay in the quote for
/// reporting.
pub fn build_quote(
    subtotal: Money,
    per_line_costs: Vec<LineShippingCost>,
    policy: &ShippingPolicy,
) -> ShippingQuote {
    let any_fallback = per_line_costs.iter().any(|l| l.used_fallback);
    let any_carrier = per_line_costs.iter().any(|l| l.source.is_carrier_backed());
    let is_emergency = !per_line_costs.is_empty() && !any_carrier;

    let (total_cost, estimated_delivery_days, tier) = if is_emergency {
        (
            policy.emergency_flat_rate,
            policy.emergency_delivery,
            ShippingTier::EmergencyFlat,
        )
    } else {
        let total: Money = per_line_costs.iter().map(|l| l.cost).sum();
        let delivery =
            combine_delivery(&per_line_costs).unwrap_or(DeliveryEstimate::new(0, 0));
        let tier = if any_fallback {
            ShippingTier::PartialFallback
        } else {
            ShippingTier::Live
        };
        (total, delivery, tier)
    };

    let threshold = policy.free_shipping_threshold;
    let is_free_shipping_applied = subtotal >= threshold;
    let shipping_charge = if is_free_shipping_applied {
        Money::zero()
    } else {
        total_cost
    };

    ShippingQuote {
        per_line_costs,
        total_cost,
        shipping_charge,
        is_free_shipping_applied,
        free_shipping_threshold: threshold,
        amount_needed_for_free: (threshold - subtotal).clamp_non_negative(),
        progress_percent: free_shipping_progress(subtotal, threshold),
        estimated_delivery_days,
        used_fallback: any_fallback || is_emergency,
        is_emergency,
        tier,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn cart_line(id: &str, qty: i64) -> CartLine {
        CartLine::new(id, "v1", qty, Money::from_cents(1000), "shirts")
    }

    fn table() -> FallbackRateTable {
        FallbackRateTable::new(FallbackRate {
            cost: Money::from_cents(1499),
            delivery: DeliveryEstimate::new(7, 14),
        })
        .with_rate(
            "us",
            FallbackRate {
                cost: Money::from_cents(499),
                delivery: DeliveryEstimate::new(3, 7),
            },
        )
    }

    fn live(id: &str, qty: i64, unit: i64, days: (u32, u32)) -> LineShippingCost {
        LineShippingCost::from_carrier(
            &cart_line(id, qty),
            Money::from_cents(unit),
            DeliveryEstimate::new(days.0, days.1),
            RateSource::Live,
        )
    }

    #[test]
    fn test_fallback_table_lookup() {
        let t = table();
        assert_eq!(t.rate_for("US").cost.cents(), 499);
        assert_eq!(t.rate_for("zz").cost.cents(), 1499);
    }

    #[test]
    fn test_fallback_line_multiplies_by_quantity() {
        let line = LineShippingCost::from_fallback(&cart_line("1", 3), &table().rate_for("US"));
        assert_eq!(line.cost.cents(), 1497);
        assert!(line.used_fallback);
        assert_eq!(line.source, RateSource::StaticFallback);
    }

    #[test]
    fn test_free_shipping_exactly_at_threshold() {
        let policy = ShippingPolicy::default();
        let quote = build_quote(Money::from_cents(5000), vec![live("1", 1, 600, (2, 4))], &policy);

        assert!(quote.is_free_shipping_applied);
        assert_eq!(quote.shipping_charge, Money::zero());
        assert_eq!(quote.total_cost.cents(), 600);
        assert_eq!(quote.amount_needed_for_free, Money::zero());
        assert_eq!(quote.progress_percent, 100.0);
    }

    #[test]
    fn test_below_threshold_progress() {
        let policy = ShippingPolicy::default();
        let quote = build_quote(Money::from_cents(2000), vec![live("1", 2, 300, (2, 4))], &policy);

        assert!(!quote.is_free_shipping_applied);
        assert_eq!(quote.shipping_charge.cents(), 600);
        assert_eq!(quote.amount_needed_for_free.cents(), 3000);
        assert_eq!(quote.progress_percent, 40.0);
        assert_eq!(quote.tier, ShippingTier::Live);
    }

    #[test]
    fn test_delivery_takes_slowest_line() {
        let policy = ShippingPolicy::default();
        let quote = build_quote(
            Money::from_cents(1000),
            vec![live("1", 1, 300, (2, 9)), live("2", 1, 300, (5, 6))],
            &policy,
        );
        assert_eq!(quote.estimated_delivery_days, DeliveryEstimate::new(5, 9));
    }

    #[test]
    fn test_partial_fallback_tier() {
        let policy = ShippingPolicy::default();
        let fallback = LineShippingCost::from_fallback(&cart_line("2", 1), &table().rate_for("US"));
        let quote = build_quote(
            Money::from_cents(1000),
            vec![live("1", 1, 300, (2, 4)), fallback],
            &policy,
        );

        assert_eq!(quote.tier, ShippingTier::PartialFallback);
        assert!(quote.used_fallback);
        assert!(!quote.is_emergency);
        assert_eq!(quote.total_cost.cents(), 799);
    }

    #[test]
    fn test_emergency_when_no_line_reached_carrier() {
        let policy = ShippingPolicy::default();
        let lines = vec![
            LineShippingCost::from_fallback(&cart_line("1", 2), &table().rate_for("US")),
            LineShippingCost::from_fallback(&cart_line("2", 1), &table().rate_for("US")),
        ];
        let quote = build_quote(Money::from_cents(3000), lines, &policy);

        assert!(quote.is_emergency);
        assert_eq!(quote.tier, ShippingTier::EmergencyFlat);
        assert_eq!(quote.total_cost, policy.emergency_flat_rate);
        assert_eq!(quote.shipping_charge, policy.emergency_flat_rate);
        assert_eq!(quote.per_line_costs.len(), 2);
    }

    #[test]
    fn test_cached_lines_are_not_fallback() {
        let policy = ShippingPolicy::default();
        let cached = LineShippingCost::from_carrier(
            &cart_line("1", 1),
            Money::from_cents(450),
            DeliveryEstimate::new(3, 5),
            RateSource::Cached,
        );
        let quote = build_quote(Money::from_cents(1000), vec![cached], &policy);
        assert!(!quote.used_fallback);
        assert!(!quote.is_emergency);
    }
}
