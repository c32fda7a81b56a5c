//! Frankfurter HTTP rate source.

use async_trait::async_trait;
use ratekeeper_common::{constants, CurrencyPair};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::error::{SourceError, SourceResult};
use crate::provider::RateSource;

/// Default public endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.frankfurter.app";

/// Configuration for the Frankfurter client.
#[derive(Debug, Clone)]
pub struct FrankfurterConfig {
    /// API base URL, without trailing slash.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for FrankfurterConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: constants::SOURCE_TIMEOUT,
        }
    }
}

#[derive(Debug, Deserialize)]
struct LatestResponse {
    #[allow(dead_code)]
    base: Option<String>,
    #[allow(dead_code)]
    date: Option<String>,
    rates: HashMap<String, serde_json::Number>,
}

/// Rate source backed by the Frankfurter `latest` endpoint.
pub struct FrankfurterSource {
    client: reqwest::Client,
    base_url: String,
}

impl FrankfurterSource {
    /// Create a new client.
    pub fn new(config: FrankfurterConfig) -> SourceResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("ratekeeper/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()
            .map_err(|e| SourceError::Unavailable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn parse_rate(pair: &CurrencyPair, number: &serde_json::Number) -> SourceResult<Decimal> {
        let text = number.to_string();
        Decimal::from_str(&text)
            .or_else(|_| Decimal::from_scientific(&text))
            .map_err(|e| SourceError::Decode {
                pair: pair.clone(),
                message: format!("rate '{text}' is not a decimal: {e}"),
            })
    }
}

#[async_trait]
impl RateSource for FrankfurterSource {
    fn name(&self) -> &str {
        "frankfurter"
    }

    #[instrument(skip(self), fields(pair = %pair))]
    async fn fetch_rate(&self, pair: &CurrencyPair) -> SourceResult<Decimal> {
        let url = format!("{}/latest", self.base_url);
        debug!(url = %url, "Requesting rate");

        let response = self
            .client
            .get(&url)
            .query(&[("from", pair.base.code()), ("to", pair.quote.code())])
            .send()
            .await
            .map_err(|e| SourceError::Network {
                pair: pair.clone(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, "Rate source returned an error status");
            return Err(SourceError::Http {
                status: status.as_u16(),
                pair: pair.clone(),
            });
        }

        let body = response.text().await.map_err(|e| SourceError::Network {
            pair: pair.clone(),
            message: e.to_string(),
        })?;

        let parsed: LatestResponse =
            serde_json::from_str(&body).map_err(|e| SourceError::Decode {
                pair: pair.clone(),
                message: e.to_string(),
            })?;

        let number = parsed
            .rates
            .get(pair.quote.code())
            .ok_or_else(|| SourceError::RateMissing(pair.clone()))?;

        let rate = Self::parse_rate(pair, number)?;
        debug!(rate = %rate, "Fetched rate");
        Ok(rate)
    }
}
