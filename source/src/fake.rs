//! Offline rate source.

use async_trait::async_trait;
use ratekeeper_common::CurrencyPair;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::debug;

use crate::error::{SourceError, SourceResult};
use crate::provider::RateSource;

const CANNED_RATES: [&str; 15] = [
    "0.04", "0.89", "1.35", "33", "18.1", "9", "0.81", "0.33", "12.34", "2.93", "2.02", "1.09",
    "3.65", "0.11", "5.4",
];

/// Source that hands out canned rates in rotation, ignoring the pair.
///
/// Useful for running the service without network access. The optional
/// delay stands in for a slow upstream.
pub struct FakeRateSource {
    rates: Vec<Decimal>,
    next: AtomicUsize,
    delay: Duration,
}

impl FakeRateSource {
    /// Create a fake source answering immediately.
    pub fn new() -> Self {
        Self::with_delay(Duration::ZERO)
    }

    /// Create a fake source that sleeps before each answer.
    pub fn with_delay(delay: Duration) -> Self {
        let rates = CANNED_RATES
            .iter()
            .filter_map(|r| r.parse().ok())
            .collect();

        Self {
            rates,
            next: AtomicUsize::new(0),
            delay,
        }
    }
}

impl Default for FakeRateSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RateSource for FakeRateSource {
    fn name(&self) -> &str {
        "fake"
    }

    async fn fetch_rate(&self, pair: &CurrencyPair) -> SourceResult<Decimal> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if self.rates.is_empty() {
            return Err(SourceError::Unavailable("no canned rates".to_string()));
        }

        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.rates.len();
        let rate = self.rates[index];
        debug!(pair = %pair, rate = %rate, "Serving canned rate");
        Ok(rate)
    }
}
