//! Rate source trait and the scriptable test source.

use async_trait::async_trait;
use ratekeeper_common::CurrencyPair;
use rust_decimal::Decimal;
use std::sync::Arc;

use crate::error::SourceResult;

/// An external source of exchange rates.
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Get the source name.
    fn name(&self) -> &str;

    /// Fetch the current rate for a currency pair.
    async fn fetch_rate(&self, pair: &CurrencyPair) -> SourceResult<Decimal>;
}

/// Shared rate source handle.
pub type SharedRateSource = Arc<dyn RateSource>;

#[cfg(any(test, feature = "test-utils"))]
mod mock {
    use super::*;
    use crate::error::SourceError;
    use parking_lot::Mutex;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;
    use tokio::sync::Semaphore;

    const OPEN_GATE_PERMITS: usize = 1 << 20;

    /// Mock rate source for testing.
    ///
    /// Rates are scripted per pair. Pairs can be made to fail or to panic,
    /// and fetches can be held behind a gate to keep the caller busy.
    pub struct MockRateSource {
        name: String,
        rates: Mutex<HashMap<CurrencyPair, Decimal>>,
        failing: Mutex<HashMap<CurrencyPair, String>>,
        panicking: Mutex<HashSet<CurrencyPair>>,
        calls: Mutex<Vec<CurrencyPair>>,
        delay: Mutex<Option<Duration>>,
        gated: AtomicBool,
        gate: Semaphore,
    }

    impl MockRateSource {
        /// Create a new mock source.
        pub fn new(name: impl Into<String>) -> Self {
            Self {
                name: name.into(),
                rates: Mutex::new(HashMap::new()),
                failing: Mutex::new(HashMap::new()),
                panicking: Mutex::new(HashSet::new()),
                calls: Mutex::new(Vec::new()),
                delay: Mutex::new(None),
                gated: AtomicBool::new(false),
                gate: Semaphore::new(0),
            }
        }

        /// Set the rate returned for a pair.
        pub fn set_rate(&self, pair: CurrencyPair, rate: Decimal) {
            self.failing.lock().remove(&pair);
            self.rates.lock().insert(pair, rate);
        }

        /// Make fetches for a pair fail.
        pub fn fail_pair(&self, pair: CurrencyPair, message: impl Into<String>) {
            self.failing.lock().insert(pair, message.into());
        }

        /// Make fetches for a pair panic.
        pub fn panic_on(&self, pair: CurrencyPair) {
            self.panicking.lock().insert(pair);
        }

        /// Sleep before answering each fetch.
        pub fn set_delay(&self, delay: Duration) {
            *self.delay.lock() = Some(delay);
        }

        /// Hold every fetch until [`release`](Self::release) lets it through.
        pub fn close_gate(&self) {
            self.gated.store(true, Ordering::SeqCst);
        }

        /// Let `n` held fetches proceed.
        pub fn release(&self, n: usize) {
            self.gate.add_permits(n);
        }

        /// Stop holding fetches.
        pub fn open_gate(&self) {
            if self.gated.swap(false, Ordering::SeqCst) {
                self.gate.add_permits(OPEN_GATE_PERMITS);
            }
        }

        /// Pairs fetched so far, in call order.
        pub fn calls(&self) -> Vec<CurrencyPair> {
            self.calls.lock().clone()
        }

        /// Number of fetches so far.
        pub fn call_count(&self) -> usize {
            self.calls.lock().len()
        }
    }

    #[async_trait]
    impl RateSource for MockRateSource {
        fn name(&self) -> &str {
            &self.name
        }

        async fn fetch_rate(&self, pair: &CurrencyPair) -> SourceResult<Decimal> {
            self.calls.lock().push(pair.clone());

            if self.gated.load(Ordering::SeqCst) {
                if let Ok(permit) = self.gate.acquire().await {
                    permit.forget();
                }
            }

            let delay = *self.delay.lock();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            if self.panicking.lock().contains(pair) {
                panic!("mock source panicked for {pair}");
            }

            if let Some(message) = self.failing.lock().get(pair) {
                return Err(SourceError::Unavailable(message.clone()));
            }

            self.rates
                .lock()
                .get(pair)
                .copied()
                .ok_or_else(|| SourceError::RateMissing(pair.clone()))
        }
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub use mock::MockRateSource;
