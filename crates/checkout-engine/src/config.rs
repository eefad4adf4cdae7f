//! # Checkout Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     CHECKOUT_CARRIER_URL=https://rates.example.com                     │
//! │     CHECKOUT_FREE_SHIPPING_THRESHOLD_CENTS=7500                        │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/checkout/checkout.toml (Linux)                           │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [shipping]
//! free_shipping_threshold_cents = 5000
//! cache_ttl_secs = 86400        # at most 30 days
//! emergency_flat_rate_cents = 999
//! cache_backend = "database"   # database | memory
//! cache_purge_every_writes = 500
//!
//! [shipping.fallback_rates.default]
//! cost_cents = 599
//! min_days = 5
//! max_days = 10
//!
//! [shipping.fallback_rates.CA]
//! cost_cents = 1299
//! min_days = 7
//! max_days = 14
//!
//! [carrier]
//! base_url = "https://rates.example.com"
//! timeout_secs = 10
//!
//! [tax]
//! apply_static_fallback = true
//! fallback_rates = { US = 7.0, GB = 20.0 }
//!
//! [database]
//! path = "./checkout.db"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use checkout_core::{
    DeliveryEstimate, FallbackRate, FallbackRateTable, Money, ShippingPolicy, TaxFallbackPolicy,
    DEFAULT_EMERGENCY_FLAT_RATE_CENTS, DEFAULT_FREE_SHIPPING_THRESHOLD_CENTS,
    DEFAULT_RATE_CACHE_TTL_SECS,
};
use checkout_db::DbConfig;

use crate::error::ConfigError;

/// Key of the mandatory catch-all entry in `shipping.fallback_rates`.
pub const DEFAULT_FALLBACK_KEY: &str = "default";

/// Upper bound for `shipping.cache_ttl_secs` (30 days).
pub const MAX_CACHE_TTL_SECS: u64 = 30 * 24 * 60 * 60;

// =============================================================================
// Shipping Settings
// =============================================================================

/// Where carrier quotes are cached between requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheBackend {
    /// The `shipping_rate_cache` table. Survives restarts.
    #[default]
    Database,

    /// A process-local map.
    Memory,
}

impl std::str::FromStr for CacheBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "database" | "sqlite" | "db" => Ok(CacheBackend::Database),
            "memory" | "in_memory" => Ok(CacheBackend::Memory),
            other => Err(ConfigError::InvalidConfig(format!(
                "Unknown cache backend: '{}'. Valid options: database, memory",
                other
            ))),
        }
    }
}

/// One row of the static per-item fallback table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackRateSettings {
    pub cost_cents: i64,
    pub min_days: u32,
    pub max_days: u32,
}

impl FallbackRateSettings {
    fn to_rate(self) -> FallbackRate {
        FallbackRate {
            cost: Money::from_cents(self.cost_cents),
            delivery: DeliveryEstimate::new(self.min_days, self.max_days),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippingSettings {
    /// Subtotal at or above which shipping is waived.
    #[serde(default = "default_free_shipping_threshold")]
    pub free_shipping_threshold_cents: i64,

    /// How long a carrier quote stays fresh.
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,

    /// Flat cart charge used when the carrier is entirely unreachable.
    #[serde(default = "default_emergency_flat_rate")]
    pub emergency_flat_rate_cents: i64,

    #[serde(default = "default_emergency_min_days")]
    pub emergency_min_days: u32,

    #[serde(default = "default_emergency_max_days")]
    pub emergency_max_days: u32,

    #[serde(default)]
    pub cache_backend: CacheBackend,

    /// Expired cache entries are swept after this many cache writes.
    #[serde(default = "default_cache_purge_every_writes")]
    pub cache_purge_every_writes: u64,

    /// Country code (or `default`) → per-item static rate.
    #[serde(default = "default_fallback_rates")]
    pub fallback_rates: BTreeMap<String, FallbackRateSettings>,
}

fn default_free_shipping_threshold() -> i64 {
    DEFAULT_FREE_SHIPPING_THRESHOLD_CENTS
}

fn default_cache_ttl() -> u64 {
    DEFAULT_RATE_CACHE_TTL_SECS
}

fn default_cache_purge_every_writes() -> u64 {
    500
}

fn default_emergency_flat_rate() -> i64 {
    DEFAULT_EMERGENCY_FLAT_RATE_CENTS
}

fn default_emergency_min_days() -> u32 {
    7
}

fn default_emergency_max_days() -> u32 {
    14
}

fn default_fallback_rates() -> BTreeMap<String, FallbackRateSettings> {
    let rate = |cost_cents, min_days, max_days| FallbackRateSettings {
        cost_cents,
        min_days,
        max_days,
    };

    BTreeMap::from([
        (DEFAULT_FALLBACK_KEY.to_string(), rate(899, 7, 14)),
        ("US".to_string(), rate(599, 5, 10)),
        ("CA".to_string(), rate(1299, 7, 14)),
        ("GB".to_string(), rate(1199, 7, 14)),
    ])
}

impl Default for ShippingSettings {
    fn default() -> Self {
        ShippingSettings {
            free_shipping_threshold_cents: default_free_shipping_threshold(),
            cache_ttl_secs: default_cache_ttl(),
            emergency_flat_rate_cents: default_emergency_flat_rate(),
            emergency_min_days: default_emergency_min_days(),
            emergency_max_days: default_emergency_max_days(),
            cache_backend: CacheBackend::default(),
            cache_purge_every_writes: default_cache_purge_every_writes(),
            fallback_rates: default_fallback_rates(),
        }
    }
}

// =============================================================================
// Carrier Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarrierSettings {
    /// Base URL of the carrier rate API, without the `/v1/rates` path.
    #[serde(default = "default_carrier_url")]
    pub base_url: String,

    /// Sent as a bearer token when present.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_carrier_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_carrier_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_carrier_timeout() -> u64 {
    10
}

fn default_user_agent() -> String {
    format!("checkout-engine/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for CarrierSettings {
    fn default() -> Self {
        CarrierSettings {
            base_url: default_carrier_url(),
            api_key: None,
            timeout_secs: default_carrier_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl CarrierSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// =============================================================================
// Tax Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxSettings {
    /// Apply `fallback_rates` when the active configuration has no entry.
    #[serde(default = "default_true")]
    pub apply_static_fallback: bool,

    #[serde(default)]
    pub fallback_applies_to_shipping: bool,

    /// Country code → whole-number percentage.
    #[serde(default)]
    pub fallback_rates: BTreeMap<String, f64>,
}

fn default_true() -> bool {
    true
}

impl Default for TaxSettings {
    fn default() -> Self {
        TaxSettings {
            apply_static_fallback: true,
            fallback_applies_to_shipping: false,
            fallback_rates: BTreeMap::new(),
        }
    }
}

// =============================================================================
// Database Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./checkout.db")
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

// =============================================================================
// Main Checkout Configuration
// =============================================================================

/// Complete engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckoutConfig {
    #[serde(default)]
    pub shipping: ShippingSettings,

    #[serde(default)]
    pub carrier: CarrierSettings,

    #[serde(default)]
    pub tax: TaxSettings,

    #[serde(default)]
    pub database: DatabaseSettings,
}

impl CheckoutConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads defaults, then the TOML file, then environment overrides,
    /// then validates.
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading checkout config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load checkout config: {}. Using defaults.", e);
            Self::default()
        })
    }

    pub fn save(&self, config_path: Option<PathBuf>) -> Result<(), ConfigError> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| ConfigError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ConfigError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| ConfigError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Checkout config saved");
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let shipping = &self.shipping;

        if shipping.free_shipping_threshold_cents < 0 {
            return Err(ConfigError::InvalidConfig(
                "free_shipping_threshold_cents must not be negative".into(),
            ));
        }

        if shipping.emergency_flat_rate_cents < 0 {
            return Err(ConfigError::InvalidConfig(
                "emergency_flat_rate_cents must not be negative".into(),
            ));
        }

        if shipping.emergency_min_days > shipping.emergency_max_days {
            return Err(ConfigError::InvalidConfig(
                "emergency_min_days must not exceed emergency_max_days".into(),
            ));
        }

        if shipping.cache_ttl_secs > MAX_CACHE_TTL_SECS {
            return Err(ConfigError::InvalidConfig(format!(
                "cache_ttl_secs must be at most {MAX_CACHE_TTL_SECS} (30 days)"
            )));
        }

        if shipping.cache_purge_every_writes == 0 {
            return Err(ConfigError::InvalidConfig(
                "cache_purge_every_writes must be greater than 0".into(),
            ));
        }

        if !shipping.fallback_rates.contains_key(DEFAULT_FALLBACK_KEY) {
            return Err(ConfigError::InvalidConfig(format!(
                "shipping.fallback_rates must include a '{}' entry",
                DEFAULT_FALLBACK_KEY
            )));
        }

        for (code, rate) in &shipping.fallback_rates {
            if rate.cost_cents < 0 || rate.min_days > rate.max_days {
                return Err(ConfigError::InvalidConfig(format!(
                    "Invalid fallback rate for '{}'",
                    code
                )));
            }
        }

        let url = &self.carrier.base_url;
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigError::InvalidConfig(format!(
                "Carrier URL must start with http:// or https://, got: {}",
                url
            )));
        }

        if self.carrier.timeout_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "carrier timeout_secs must be greater than 0".into(),
            ));
        }

        for (code, rate) in &self.tax.fallback_rates {
            if !(0.0..=100.0).contains(rate) {
                return Err(ConfigError::InvalidConfig(format!(
                    "Tax fallback rate for '{}' must be between 0 and 100",
                    code
                )));
            }
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::InvalidConfig(
                "database max_connections must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies `CHECKOUT_*` overrides from any key lookup.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("CHECKOUT_CARRIER_URL") {
            debug!(url = %url, "Overriding carrier URL from environment");
            self.carrier.base_url = url;
        }

        if let Some(key) = lookup("CHECKOUT_CARRIER_API_KEY") {
            self.carrier.api_key = Some(key).filter(|k| !k.is_empty());
        }

        if let Some(secs) = lookup("CHECKOUT_CARRIER_TIMEOUT_SECS") {
            if let Ok(s) = secs.parse::<u64>() {
                debug!(timeout_secs = s, "Overriding carrier timeout from environment");
                self.carrier.timeout_secs = s;
            }
        }

        if let Some(cents) = lookup("CHECKOUT_FREE_SHIPPING_THRESHOLD_CENTS") {
            if let Ok(c) = cents.parse::<i64>() {
                debug!(threshold_cents = c, "Overriding free shipping threshold from environment");
                self.shipping.free_shipping_threshold_cents = c;
            }
        }

        if let Some(secs) = lookup("CHECKOUT_CACHE_TTL_SECS") {
            if let Ok(s) = secs.parse::<u64>() {
                self.shipping.cache_ttl_secs = s;
            }
        }

        if let Some(backend) = lookup("CHECKOUT_CACHE_BACKEND") {
            match backend.parse() {
                Ok(parsed) => self.shipping.cache_backend = parsed,
                Err(_) => warn!(backend = %backend, "Unknown cache backend in environment"),
            }
        }

        if let Some(path) = lookup("CHECKOUT_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }
    }

    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "storefront", "checkout")
            .map(|dirs| dirs.config_dir().join("checkout.toml"))
    }

    // =========================================================================
    // Conversions into engine policies
    // =========================================================================

    pub fn shipping_policy(&self) -> ShippingPolicy {
        ShippingPolicy {
            free_shipping_threshold: Money::from_cents(self.shipping.free_shipping_threshold_cents),
            emergency_flat_rate: Money::from_cents(self.shipping.emergency_flat_rate_cents),
            emergency_delivery: DeliveryEstimate::new(
                self.shipping.emergency_min_days,
                self.shipping.emergency_max_days,
            ),
        }
    }

    /// The static shipping table. A missing `default` entry falls back to
    /// the emergency values; `validate` rejects that case at load time.
    pub fn fallback_rate_table(&self) -> FallbackRateTable {
        let default = self
            .shipping
            .fallback_rates
            .get(DEFAULT_FALLBACK_KEY)
            .map(|r| r.to_rate())
            .unwrap_or(FallbackRate {
                cost: Money::from_cents(self.shipping.emergency_flat_rate_cents),
                delivery: DeliveryEstimate::new(
                    self.shipping.emergency_min_days,
                    self.shipping.emergency_max_days,
                ),
            });

        self.shipping
            .fallback_rates
            .iter()
            .filter(|(code, _)| code.as_str() != DEFAULT_FALLBACK_KEY)
            .fold(FallbackRateTable::new(default), |table, (code, rate)| {
                table.with_rate(code, rate.to_rate())
            })
    }

    pub fn tax_policy(&self) -> TaxFallbackPolicy {
        TaxFallbackPolicy {
            apply_static_fallback: self.tax.apply_static_fallback,
            applies_to_shipping: self.tax.fallback_applies_to_shipping,
            rates: self
                .tax
                .fallback_rates
                .iter()
                .map(|(code, rate)| (code.trim().to_uppercase(), *rate))
                .collect(),
        }
    }

    /// TTL for cached carrier quotes, clamped to [`MAX_CACHE_TTL_SECS`].
    pub fn cache_ttl(&self) -> chrono::Duration {
        let secs = self.shipping.cache_ttl_secs.min(MAX_CACHE_TTL_SECS);
        i64::try_from(secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or_else(|| chrono::Duration::days(30))
    }

    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.database.path.clone()).max_connections(self.database.max_connections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = CheckoutConfig::default();
        assert_eq!(config.shipping.free_shipping_threshold_cents, 5000);
        assert_eq!(config.shipping.cache_ttl_secs, 86_400);
        assert_eq!(config.carrier.timeout_secs, 10);
        assert!(config.tax.apply_static_fallback);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = CheckoutConfig::default();

        config.carrier.base_url = "ftp://rates".to_string();
        assert!(config.validate().is_err());

        config.carrier.base_url = "https://rates.example.com".to_string();
        assert!(config.validate().is_ok());

        config.shipping.fallback_rates.remove(DEFAULT_FALLBACK_KEY);
        assert!(config.validate().is_err());

        let mut config = CheckoutConfig::default();
        config.tax.fallback_rates.insert("US".to_string(), 120.0);
        assert!(config.validate().is_err());

        let mut config = CheckoutConfig::default();
        config.carrier.timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = CheckoutConfig::default();
        config.shipping.cache_purge_every_writes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_cache_ttl_is_bounded() {
        let mut config = CheckoutConfig::default();

        config.shipping.cache_ttl_secs = MAX_CACHE_TTL_SECS;
        assert!(config.validate().is_ok());
        assert_eq!(config.cache_ttl(), chrono::Duration::days(30));

        config.shipping.cache_ttl_secs = MAX_CACHE_TTL_SECS + 1;
        assert!(config.validate().is_err());

        // Unvalidated values are clamped instead of overflowing.
        config.shipping.cache_ttl_secs = u64::MAX;
        assert_eq!(config.cache_ttl(), chrono::Duration::days(30));
        config.shipping.cache_ttl_secs = (i64::MAX / 1000) as u64 + 1;
        assert_eq!(config.cache_ttl(), chrono::Duration::days(30));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: CheckoutConfig = toml::from_str(
            r#"
            [shipping]
            free_shipping_threshold_cents = 7500

            [tax]
            fallback_rates = { us = 7.0 }
            "#,
        )
        .unwrap();

        assert_eq!(config.shipping.free_shipping_threshold_cents, 7500);
        assert_eq!(config.shipping.cache_ttl_secs, 86_400);
        assert!(config.shipping.fallback_rates.contains_key("default"));
        assert_eq!(config.tax_policy().rates.get("US"), Some(&7.0));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("CHECKOUT_CARRIER_URL", "https://rates.internal"),
            ("CHECKOUT_CARRIER_TIMEOUT_SECS", "3"),
            ("CHECKOUT_FREE_SHIPPING_THRESHOLD_CENTS", "not-a-number"),
            ("CHECKOUT_CACHE_BACKEND", "memory"),
            ("CHECKOUT_DB_PATH", "/tmp/checkout.db"),
        ]);

        let mut config = CheckoutConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.carrier.base_url, "https://rates.internal");
        assert_eq!(config.carrier.timeout_secs, 3);
        // Unparseable values are ignored.
        assert_eq!(config.shipping.free_shipping_threshold_cents, 5000);
        assert_eq!(config.shipping.cache_backend, CacheBackend::Memory);
        assert_eq!(config.database.path, PathBuf::from("/tmp/checkout.db"));
    }

    #[test]
    fn test_fallback_table_conversion() {
        let table = CheckoutConfig::default().fallback_rate_table();
        assert_eq!(table.rate_for("ca").cost.cents(), 1299);
        assert_eq!(table.rate_for("ZZ").cost.cents(), 899);
        assert_eq!(table.default_rate().delivery, DeliveryEstimate::new(7, 14));
    }

    #[test]
    fn test_shipping_policy_conversion() {
        let mut config = CheckoutConfig::default();
        config.shipping.free_shipping_threshold_cents = 10_000;

        let policy = config.shipping_policy();
        assert_eq!(policy.free_shipping_threshold.cents(), 10_000);
        assert_eq!(policy.emergency_flat_rate.cents(), 999);
        assert_eq!(config.cache_ttl(), chrono::Duration::hours(24));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let path = std::env::temp_dir().join(format!(
            "checkout-config-{}.toml",
            std::process::id()
        ));

        let mut config = CheckoutConfig::default();
        config.shipping.free_shipping_threshold_cents = 6000;
        config.save(Some(path.clone())).unwrap();

        let loaded = CheckoutConfig::load(Some(path.clone())).unwrap();
        assert_eq!(loaded.shipping.free_shipping_threshold_cents, 6000);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_toml_serialization() {
        let config = CheckoutConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[shipping]"));
        assert!(toml_str.contains("[carrier]"));
    }
}
