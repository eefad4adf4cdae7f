//! # Tax Calculation
//!
//! Jurisdiction lookup and tax math. One rate per country; whether
//! shipping is taxable is a property of that country's rate.
//!
//! ## Rate Resolution
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  active config has country?  ──yes──► Configured (highest priority)    │
//! │           │ no                                                          │
//! │           ▼                                                             │
//! │  static fallback enabled?    ──no───► None (zero tax)                   │
//! │           │ yes                                                         │
//! │           ▼                                                             │
//! │  static table has country?   ──yes──► StaticFallback                    │
//! │           │ no                                                          │
//! │           ▼                                                             │
//! │  active config present?      ──yes──► ConfigDefault                     │
//! │           │ no                                                          │
//! │           ▼                                                             │
//! │  None (zero tax)                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Formula
//! ```text
//! taxable = subtotal + (applies_to_shipping ? shipping : 0)
//! tax     = round2(taxable × rate / 100)
//! ```
//! Tax is computed on the pre-discount subtotal.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{CountryTaxRate, TaxConfiguration};

/// Where the applied rate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum TaxSource {
    Configured,
    StaticFallback,
    ConfigDefault,
    None,
}

/// Result of a tax calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxResult {
    pub tax_amount: Money,
    /// Whole-number percentage that was applied.
    pub tax_rate_percent: f64,
    pub applies_to_shipping: bool,
    pub taxable_base: Money,
    pub country_code: String,
    pub source: TaxSource,
}

impl TaxResult {
    /// Zero tax for a country with no applicable rate.
    pub fn zero(country_code: &str, subtotal: Money) -> Self {
        TaxResult {
            tax_amount: Money::zero(),
            tax_rate_percent: 0.0,
            applies_to_shipping: false,
            taxable_base: subtotal,
            country_code: country_code.to_string(),
            source: TaxSource::None,
        }
    }
}

/// Engine policy for countries the active configuration doesn't cover.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TaxFallbackPolicy {
    pub apply_static_fallback: bool,
    /// Shipping taxability for static and default rates.
    pub applies_to_shipping: bool,
    /// Country code (upper case) → whole-number percentage.
    pub rates: HashMap<String, f64>,
}

/// Finds a country's rate; among duplicates the highest priority wins,
/// ties go to the first entry.
pub fn find_country_rate<'a>(
    config: &'a TaxConfiguration,
    country_code: &str,
) -> Option<&'a CountryTaxRate> {
    config
        .country_rates
        .iter()
        .filter(|r| r.country_code.eq_ignore_ascii_case(country_code))
        .reduce(|best, r| if r.priority > best.priority { r } else { best })
}

fn apply_rate(
    subtotal: Money,
    shipping: Money,
    country_code: &str,
    rate_percent: f64,
    applies_to_shipping: bool,
    source: TaxSource,
) -> TaxResult {
    let taxable_base = if applies_to_shipping {
        subtotal + shipping
    } else {
        subtotal
    };

    TaxResult {
        tax_amount: taxable_base.percentage(rate_percent).clamp_non_negative(),
        tax_rate_percent: rate_percent,
        applies_to_shipping,
        taxable_base,
        country_code: country_code.to_string(),
        source,
    }
}

/// Calculates tax for a destination country.
///
/// A missing or inactive configuration is not an error; the fallback
/// policy decides what happens.
///
/// ## Example
/// ```rust
/// use checkout_core::money::Money;
/// use checkout_core::tax::{calculate_tax, TaxFallbackPolicy};
/// use checkout_core::types::{CountryTaxRate, TaxConfiguration};
///
/// let config = TaxConfiguration {
///     id: "tax-1".into(),
///     name: "Default".into(),
///     is_active: true,
///     default_rate_percent: 0.0,
///     country_rates: vec![CountryTaxRate {
///         country_code: "GB".into(),
///         rate_percent: 20.0,
///         applies_to_shipping: false,
///         priority: 0,
///     }],
/// };
///
/// let result = calculate_tax(
///     Some(&config),
///     Money::from_cents(10000),
///     Money::zero(),
///     "GB",
///     &TaxFallbackPolicy::default(),
/// );
/// assert_eq!(result.tax_amount.cents(), 2000);
/// ```
pub fn calculate_tax(
    config: Option<&TaxConfiguration>,
    subtotal: Money,
    shipping: Money,
    country_code: &str,
    policy: &TaxFallbackPolicy,
) -> TaxResult {
    let country_code = country_code.trim().to_uppercase();
    let active = config.filter(|c| c.is_active);

    if let Some(rate) = active.and_then(|c| find_country_rate(c, &country_code)) {
        return apply_rate(
            subtotal,
            shipping,
            &country_code,
            rate.rate_percent,
            rate.applies_to_shipping,
            TaxSource::Configured,
        );
    }

    if !policy.apply_static_fallback {
        return TaxResult::zero(&country_code, subtotal);
    }

    if let Some(&rate) = policy.rates.get(&country_code) {
        return apply_rate(
            subtotal,
            shipping,
            &country_code,
            rate,
            policy.applies_to_shipping,
            TaxSource::StaticFallback,
        );
    }

    match active {
        Some(c) => apply_rate(
            subtotal,
            shipping,
            &country_code,
            c.default_rate_percent,
            policy.applies_to_shipping,
            TaxSource::ConfigDefault,
        ),
        None => TaxResult::zero(&country_code, subtotal),
    }
}

// =============================================================================
// Configuration Validation
// =============================================================================

/// Problems found in a tax configuration, reported as data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxConfigValidation {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

/// Checks a configuration for missing rates, duplicate or malformed
/// country codes, and out-of-range percentages.
pub fn validate_configuration(config: &TaxConfiguration) -> TaxConfigValidation {
    let mut errors = Vec::new();

    if config.country_rates.is_empty() {
        errors.push("No tax rates configured".to_string());
    }

    if !(0.0..=100.0).contains(&config.default_rate_percent) {
        errors.push(format!(
            "Default rate {} must be between 0 and 100",
            config.default_rate_percent
        ));
    }

    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    for rate in &config.country_rates {
        let code = rate.country_code.trim().to_uppercase();

        if code.len() != 2 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            errors.push(format!("Invalid country code: '{}'", rate.country_code));
            continue;
        }

        if !seen.insert(code.clone()) && reported.insert(code.clone()) {
            errors.push(format!("Duplicate country code: {code}"));
        }

        if !(0.0..=100.0).contains(&rate.rate_percent) {
            errors.push(format!(
                "Rate for {code} must be between 0 and 100 (got {})",
                rate.rate_percent
            ));
        }
    }

    TaxConfigValidation {
        is_valid: errors.is_empty(),
        errors,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn rate(code: &str, pct: f64, ship: bool, priority: i32) -> CountryTaxRate {
        CountryTaxRate {
            country_code: code.to_string(),
            rate_percent: pct,
            applies_to_shipping: ship,
            priority,
        }
    }

    fn config(rates: Vec<CountryTaxRate>) -> TaxConfiguration {
        TaxConfiguration {
            id: "tax-1".to_string(),
            name: "Standard".to_string(),
            is_active: true,
            default_rate_percent: 5.0,
            country_rates: rates,
        }
    }

    fn no_fallback() -> TaxFallbackPolicy {
        TaxFallbackPolicy::default()
    }

    #[test]
    fn test_rate_twenty_on_hundred() {
        let cfg = config(vec![rate("GB", 20.0, false, 0)]);
        let result = calculate_tax(
            Some(&cfg),
            Money::from_cents(10000),
            Money::zero(),
            "GB",
            &no_fallback(),
        );

        assert_eq!(result.tax_amount.cents(), 2000);
        assert_eq!(result.tax_rate_percent, 20.0);
        assert_eq!(result.source, TaxSource::Configured);
    }

    #[test]
    fn test_shipping_taxable_flag() {
        let cfg = config(vec![rate("DE", 19.0, true, 0), rate("US", 8.0, false, 0)]);
        let subtotal = Money::from_cents(10000);
        let shipping = Money::from_cents(1000);

        let de = calculate_tax(Some(&cfg), subtotal, shipping, "DE", &no_fallback());
        assert_eq!(de.taxable_base.cents(), 11000);
        assert_eq!(de.tax_amount.cents(), 2090);

        let us = calculate_tax(Some(&cfg), subtotal, shipping, "us", &no_fallback());
        assert_eq!(us.taxable_base.cents(), 10000);
        assert_eq!(us.tax_amount.cents(), 800);
        assert_eq!(us.country_code, "US");
    }

    #[test]
    fn test_unknown_country_without_fallback_is_zero() {
        let cfg = config(vec![rate("GB", 20.0, false, 0)]);
        let result = calculate_tax(
            Some(&cfg),
            Money::from_cents(10000),
            Money::zero(),
            "FR",
            &no_fallback(),
        );
        assert_eq!(result.tax_amount, Money::zero());
        assert_eq!(result.source, TaxSource::None);
    }

    #[test]
    fn test_static_fallback_then_config_default() {
        let cfg = config(vec![rate("GB", 20.0, false, 0)]);
        let policy = TaxFallbackPolicy {
            apply_static_fallback: true,
            applies_to_shipping: false,
            rates: HashMap::from([("FR".to_string(), 10.0)]),
        };
        let subtotal = Money::from_cents(10000);

        let fr = calculate_tax(Some(&cfg), subtotal, Money::zero(), "FR", &policy);
        assert_eq!(fr.source, TaxSource::StaticFallback);
        assert_eq!(fr.tax_amount.cents(), 1000);

        let jp = calculate_tax(Some(&cfg), subtotal, Money::zero(), "JP", &policy);
        assert_eq!(jp.source, TaxSource::ConfigDefault);
        assert_eq!(jp.tax_amount.cents(), 500);

        let none = calculate_tax(None, subtotal, Money::zero(), "JP", &policy);
        assert_eq!(none.source, TaxSource::None);
        assert_eq!(none.tax_amount, Money::zero());
    }

    #[test]
    fn test_inactive_config_is_ignored() {
        let mut cfg = config(vec![rate("GB", 20.0, false, 0)]);
        cfg.is_active = false;
        let result = calculate_tax(
            Some(&cfg),
            Money::from_cents(10000),
            Money::zero(),
            "GB",
            &no_fallback(),
        );
        assert_eq!(result.source, TaxSource::None);
    }

    #[test]
    fn test_duplicate_country_highest_priority_wins() {
        let cfg = config(vec![
            rate("US", 5.0, false, 0),
            rate("US", 7.0, false, 10),
            rate("US", 9.0, false, 10),
        ]);
        let chosen = find_country_rate(&cfg, "US").unwrap();
        assert_eq!(chosen.rate_percent, 7.0);
    }

    #[test]
    fn test_validate_configuration() {
        let ok = validate_configuration(&config(vec![rate("GB", 20.0, false, 0)]));
        assert!(ok.is_valid);
        assert!(ok.errors.is_empty());

        let empty = validate_configuration(&config(vec![]));
        assert!(!empty.is_valid);
        assert_eq!(empty.errors, vec!["No tax rates configured".to_string()]);

        let bad = validate_configuration(&config(vec![
            rate("US", 5.0, false, 0),
            rate("us", 6.0, false, 0),
            rate("USA", 6.0, false, 0),
            rate("CA", 150.0, false, 0),
        ]));
        assert!(!bad.is_valid);
        assert!(bad.errors.contains(&"Duplicate country code: US".to_string()));
        assert!(bad.errors.iter().any(|e| e.contains("Invalid country code")));
        assert!(bad.errors.iter().any(|e| e.starts_with("Rate for CA")));
    }
}
