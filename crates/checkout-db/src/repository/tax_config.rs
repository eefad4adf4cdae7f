//! # Tax Configuration Repository
//!
//! Stores tax configurations and their per-country rates.
//!
//! ## Shape
//! ```text
//! tax_configurations (1) ──< tax_country_rates (N)
//!        │
//!        └── at most one row with is_active = 1 (partial unique index)
//! ```
//!
//! Duplicate country codes are allowed in storage. They are reported by
//! `checkout_core::tax::validate_configuration` and resolved by priority.

use chrono::Utc;
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use checkout_core::{CountryTaxRate, TaxConfiguration};

#[derive(Debug, FromRow)]
struct TaxConfigRow {
    id: String,
    name: String,
    is_active: bool,
    default_rate_percent: f64,
}

#[derive(Debug, FromRow)]
struct CountryRateRow {
    country_code: String,
    rate_percent: f64,
    applies_to_shipping: bool,
    priority: i32,
}

impl From<CountryRateRow> for CountryTaxRate {
    fn from(row: CountryRateRow) -> Self {
        CountryTaxRate {
            country_code: row.country_code,
            rate_percent: row.rate_percent,
            applies_to_shipping: row.applies_to_shipping,
            priority: row.priority,
        }
    }
}

/// Repository for tax configuration operations.
#[derive(Debug, Clone)]
pub struct TaxConfigRepository {
    pool: SqlitePool,
}

impl TaxConfigRepository {
    /// Creates a new TaxConfigRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TaxConfigRepository { pool }
    }

    /// Returns the active configuration with its rates, if any.
    pub async fn get_active(&self) -> DbResult<Option<TaxConfiguration>> {
        let row = sqlx::query_as::<_, TaxConfigRow>(
            r#"
            SELECT id, name, is_active, default_rate_percent
            FROM tax_configurations
            WHERE is_active = 1
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.with_rates(row).await?)),
            None => {
                debug!("No active tax configuration");
                Ok(None)
            }
        }
    }

    /// Gets a configuration by ID, active or not.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<TaxConfiguration>> {
        let row = sqlx::query_as::<_, TaxConfigRow>(
            r#"
            SELECT id, name, is_active, default_rate_percent
            FROM tax_configurations
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.with_rates(row).await?)),
            None => Ok(None),
        }
    }

    async fn with_rates(&self, row: TaxConfigRow) -> DbResult<TaxConfiguration> {
        let rates = sqlx::query_as::<_, CountryRateRow>(
            r#"
            SELECT country_code, rate_percent, applies_to_shipping, priority
            FROM tax_country_rates
            WHERE tax_configuration_id = ?1
            ORDER BY id
            "#,
        )
        .bind(&row.id)
        .fetch_all(&self.pool)
        .await?;

        debug!(config_id = %row.id, rates = rates.len(), "Loaded tax configuration");

        Ok(TaxConfiguration {
            id: row.id,
            name: row.name,
            is_active: row.is_active,
            default_rate_percent: row.default_rate_percent,
            country_rates: rates.into_iter().map(CountryTaxRate::from).collect(),
        })
    }

    /// Inserts a configuration and its rates in one transaction.
    ///
    /// Inserting an active configuration while another is active fails with
    /// [`DbError::UniqueViolation`].
    pub async fn insert(&self, config: &TaxConfiguration) -> DbResult<()> {
        debug!(id = %config.id, rates = config.country_rates.len(), "Inserting tax configuration");

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO tax_configurations (
                id, name, is_active, default_rate_percent, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&config.id)
        .bind(&config.name)
        .bind(config.is_active)
        .bind(config.default_rate_percent)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        for rate in &config.country_rates {
            sqlx::query(
                r#"
                INSERT INTO tax_country_rates (
                    tax_configuration_id, country_code, rate_percent,
                    applies_to_shipping, priority
                ) VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )
            .bind(&config.id)
            .bind(rate.country_code.trim().to_uppercase())
            .bind(rate.rate_percent)
            .bind(rate.applies_to_shipping)
            .bind(rate.priority)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Makes `id` the only active configuration.
    pub async fn activate(&self, id: &str) -> DbResult<()> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE tax_configurations SET is_active = 0, updated_at = ?1 WHERE is_active = 1",
        )
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query(
            "UPDATE tax_configurations SET is_active = 1, updated_at = ?1 WHERE id = ?2",
        )
        .bind(now)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("TaxConfiguration", id));
        }

        tx.commit().await?;
        info!(config_id = %id, "Tax configuration activated");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
