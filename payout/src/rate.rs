//! Exchange-rate quoting.
//!
//! The orchestrator never trusts a float from the wire: quotes cross into
//! fixed-point `Rate` at exactly one place, `Rate::from_f64`, which rejects
//! non-finite and non-positive values.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use merit_types::Rate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RateError {
    /// The source answered but produced no usable quote.
    #[error("rate unavailable: {0}")]
    Unavailable(String),

    /// The source could not be reached or answered garbage.
    #[error("rate request failed: {0}")]
    Http(String),
}

/// Source of the unit-price quote used to convert reward amounts to coins.
#[async_trait]
pub trait RateSource: Send + Sync {
    async fn get_rate(&self) -> Result<Rate, RateError>;
}

/// Quote client for a Coingecko-compatible price endpoint.
///
/// Queries GET `{base_url}/simple/price?ids={asset_id}&vs_currencies={vs}`
/// and reads the nested `{asset_id: {vs_currency: price}}` response.
#[derive(Clone)]
pub struct CoingeckoRates {
    http: reqwest::Client,
    base_url: String,
    asset_id: String,
    vs_currency: String,
}

impl CoingeckoRates {
    pub fn new(
        base_url: impl Into<String>,
        asset_id: impl Into<String>,
        vs_currency: impl Into<String>,
    ) -> Result<Self, RateError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| RateError::Http(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            asset_id: asset_id.into(),
            vs_currency: vs_currency.into(),
        })
    }
}

#[async_trait]
impl RateSource for CoingeckoRates {
    async fn get_rate(&self) -> Result<Rate, RateError> {
        let url = format!(
            "{}/simple/price?ids={}&vs_currencies={}",
            self.base_url, self.asset_id, self.vs_currency
        );

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| RateError::Http(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(RateError::Http(format!(
                "price endpoint returned HTTP {}",
                response.status()
            )));
        }

        let body: HashMap<String, HashMap<String, f64>> = response
            .json()
            .await
            .map_err(|e| RateError::Http(format!("invalid JSON response: {e}")))?;

        let quote = body
            .get(&self.asset_id)
            .and_then(|prices| prices.get(&self.vs_currency))
            .copied()
            .ok_or_else(|| {
                RateError::Unavailable(format!(
                    "no {}/{} quote in response",
                    self.asset_id, self.vs_currency
                ))
            })?;

        Rate::from_f64(quote)
            .ok_or_else(|| RateError::Unavailable(format!("unusable quote {quote}")))
    }
}
