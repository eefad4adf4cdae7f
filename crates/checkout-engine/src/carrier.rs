//! # HTTP Carrier Client
//!
//! [`CarrierRateProvider`] over the carrier's JSON rate API.
//!
//! ## Wire Format
//! ```text
//! POST {base_url}/v1/rates
//! Authorization: Bearer {api_key}        (when configured)
//!
//! { "product_ref": "pod-1", "variant_id": "v-m",
//!   "country_code": "US", "region_code": "CA" }
//!
//! 200 OK
//! { "cost_minor_units": 450, "min_delivery_days": 3, "max_delivery_days": 5 }
//! ```
//!
//! Every failure is a [`CarrierError`]: timeouts, transport errors, non-2xx
//! statuses, and bodies that don't decode, carry a cost outside
//! `0..=MAX_CARRIER_UNIT_COST_CENTS`, or an inverted delivery window.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use checkout_core::DeliveryEstimate;

use crate::collaborators::{CarrierQuote, CarrierRateProvider};
use crate::config::CarrierSettings;
use crate::error::{CarrierError, ConfigError};

#[derive(Debug, Serialize)]
struct RateRequest<'a> {
    product_ref: &'a str,
    variant_id: &'a str,
    country_code: &'a str,
    region_code: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct RateResponse {
    cost_minor_units: i64,
    min_delivery_days: u32,
    max_delivery_days: u32,
}

impl TryFrom<RateResponse> for CarrierQuote {
    type Error = CarrierError;

    fn try_from(body: RateResponse) -> Result<Self, Self::Error> {
        CarrierQuote {
            cost_minor_units: body.cost_minor_units,
            estimated_days: DeliveryEstimate::new(body.min_delivery_days, body.max_delivery_days),
        }
        .checked()
    }
}

/// Client for the carrier rate API.
#[derive(Debug, Clone)]
pub struct HttpCarrierClient {
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
    http: Client,
}

impl HttpCarrierClient {
    pub fn from_settings(settings: &CarrierSettings) -> Result<Self, ConfigError> {
        let http = Client::builder()
            .timeout(settings.timeout())
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|e| ConfigError::InvalidConfig(format!("carrier client: {e}")))?;

        Ok(HttpCarrierClient {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            timeout: settings.timeout(),
            http,
        })
    }

    fn rates_url(&self) -> String {
        format!("{}/v1/rates", self.base_url)
    }

    fn timeout_millis(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }
}

#[async_trait]
impl CarrierRateProvider for HttpCarrierClient {
    async fn quote_shipping(
        &self,
        carrier_product_ref: &str,
        variant_id: &str,
        country_code: &str,
        region_code: Option<&str>,
    ) -> Result<CarrierQuote, CarrierError> {
        let body = RateRequest {
            product_ref: carrier_product_ref,
            variant_id,
            country_code,
            region_code,
        };

        let mut request = self.http.post(self.rates_url()).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                CarrierError::Timeout(self.timeout_millis())
            } else {
                CarrierError::from(e)
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();

            return Err(CarrierError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: RateResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                CarrierError::Timeout(self.timeout_millis())
            } else {
                CarrierError::MalformedResponse(e.to_string())
            }
        })?;

        debug!(
            product_ref = %carrier_product_ref,
            country = %country_code,
            cost_minor_units = parsed.cost_minor_units,
            "Carrier quote received"
        );

        CarrierQuote::try_from(parsed)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
