//! # Tax Calculator
//!
//! Loads the active tax configuration and applies
//! [`checkout_core::tax::calculate_tax`]. A missing configuration or an
//! unreachable store is a configuration problem: it is logged and the
//! calculation continues with the fallback policy.

use std::sync::Arc;
use tracing::warn;

use checkout_core::tax::{calculate_tax, validate_configuration};
use checkout_core::{Money, TaxConfigValidation, TaxConfiguration, TaxFallbackPolicy, TaxResult};

use crate::collaborators::TaxConfigStore;

pub struct TaxCalculator {
    store: Arc<dyn TaxConfigStore>,
    policy: TaxFallbackPolicy,
}

impl TaxCalculator {
    pub fn new(store: Arc<dyn TaxConfigStore>, policy: TaxFallbackPolicy) -> Self {
        TaxCalculator { store, policy }
    }

    async fn active_config(&self) -> Option<TaxConfiguration> {
        match self.store.get_active_tax_config().await {
            Ok(Some(config)) => Some(config),
            Ok(None) => {
                warn!("No active tax configuration, using fallback tax policy");
                None
            }
            Err(e) => {
                warn!(error = %e, "Tax configuration unavailable, using fallback tax policy");
                None
            }
        }
    }

    /// Tax for the destination country. Never fails.
    pub async fn calculate_tax(
        &self,
        subtotal: Money,
        shipping_cost: Money,
        country_code: &str,
    ) -> TaxResult {
        let config = self.active_config().await;
        calculate_tax(
            config.as_ref(),
            subtotal,
            shipping_cost,
            country_code,
            &self.policy,
        )
    }

    /// Problems in the active configuration, reported as data.
    pub async fn validate_configuration(&self) -> TaxConfigValidation {
        match self.active_config().await {
            Some(config) => validate_configuration(&config),
            None => TaxConfigValidation {
                is_valid: false,
                errors: vec!["No active tax configuration".to_string()],
            },
        }
    }
}
