//! In-memory store.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use ratekeeper_common::{
    now, CurrencyPair, Rate, RatesError, RequestId, RequestStatus, Result, Timestamp,
    UpdateRequest,
};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

use crate::store::RateStore;

/// Store operations that can be made to fail in tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    PlaceRequest,
    UpsertRate,
    MarkProcessed,
    MarkFailed,
    Read,
}

#[derive(Debug, Clone)]
struct RateRow {
    value: Option<Decimal>,
    updated_at: Timestamp,
}

/// Store keeping everything in process memory.
///
/// Ids start at 1 and are never reused. Data is lost when the process exits.
pub struct MemoryRateStore {
    rates: RwLock<HashMap<CurrencyPair, RateRow>>,
    requests: RwLock<BTreeMap<RequestId, UpdateRequest>>,
    next_id: AtomicU64,
    failing: Mutex<HashSet<StoreOp>>,
}

impl MemoryRateStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            rates: RwLock::new(HashMap::new()),
            requests: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            failing: Mutex::new(HashSet::new()),
        }
    }

    /// Create a store with rate rows that have no value yet.
    pub fn with_pairs(pairs: impl IntoIterator<Item = CurrencyPair>) -> Self {
        let store = Self::new();
        {
            let mut rates = store.rates.write();
            for pair in pairs {
                rates.insert(
                    pair,
                    RateRow {
                        value: None,
                        updated_at: now(),
                    },
                );
            }
        }
        store
    }

    /// Number of requests placed so far.
    pub fn request_count(&self) -> usize {
        self.requests.read().len()
    }

    fn check(&self, op: StoreOp) -> Result<()> {
        if self.failing.lock().contains(&op) {
            return Err(RatesError::Database(format!("injected failure on {op:?}")));
        }
        Ok(())
    }

    fn set_terminal_status(&self, id: RequestId, status: RequestStatus) -> Result<()> {
        let mut requests = self.requests.write();
        let request = requests
            .get_mut(&id)
            .ok_or(RatesError::RequestNotFound(id))?;

        if request.status.can_transition_to(status) {
            request.status = status;
            debug!(request_id = %id, status = %status, "Request status updated");
        } else {
            warn!(
                request_id = %id,
                current = %request.status,
                requested = %status,
                "Request already terminal, status left unchanged"
            );
        }
        Ok(())
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl MemoryRateStore {
    /// Make an operation fail until [`recover`](Self::recover) is called.
    pub fn fail_on(&self, op: StoreOp) {
        self.failing.lock().insert(op);
    }

    /// Stop failing an operation.
    pub fn recover(&self, op: StoreOp) {
        self.failing.lock().remove(&op);
    }

    /// Current status of a request, if it exists.
    pub fn status_of(&self, id: RequestId) -> Option<RequestStatus> {
        self.requests.read().get(&id).map(|r| r.status)
    }
}

impl Default for MemoryRateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RateStore for MemoryRateStore {
    async fn place_request(&self, pair: &CurrencyPair) -> Result<RequestId> {
        self.check(StoreOp::PlaceRequest)?;

        let id = RequestId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.requests
            .write()
            .insert(id, UpdateRequest::submitted(id, pair.clone()));
        Ok(id)
    }

    async fn upsert_rate(&self, pair: &CurrencyPair, rate: Decimal) -> Result<()> {
        self.check(StoreOp::UpsertRate)?;

        self.rates.write().insert(
            pair.clone(),
            RateRow {
                value: Some(rate),
                updated_at: now(),
            },
        );
        Ok(())
    }

    async fn mark_processed(&self, id: RequestId) -> Result<()> {
        self.check(StoreOp::MarkProcessed)?;
        self.set_terminal_status(id, RequestStatus::Ok)
    }

    async fn mark_failed(&self, id: RequestId) -> Result<()> {
        self.check(StoreOp::MarkFailed)?;
        self.set_terminal_status(id, RequestStatus::Failed)
    }

    async fn get_rate_by_pair(&self, pair: &CurrencyPair) -> Result<Rate> {
        self.check(StoreOp::Read)?;

        let rates = self.rates.read();
        let row = rates
            .get(pair)
            .ok_or_else(|| RatesError::PairNotFound(pair.clone()))?;
        let value = row
            .value
            .ok_or_else(|| RatesError::PairNotFound(pair.clone()))?;

        Ok(Rate {
            pair: pair.clone(),
            value,
            updated_at: row.updated_at,
        })
    }

    async fn get_rate_by_request_id(&self, id: RequestId) -> Result<Rate> {
        let request = self.get_request(id).await?;
        self.get_rate_by_pair(&request.pair).await
    }

    async fn get_request(&self, id: RequestId) -> Result<UpdateRequest> {
        self.check(StoreOp::Read)?;

        self.requests
            .read()
            .get(&id)
            .cloned()
            .ok_or(RatesError::RequestNotFound(id))
    }

    async fn pairs_missing_rate(&self) -> Result<Vec<CurrencyPair>> {
        self.check(StoreOp::Read)?;

        let mut pairs: Vec<CurrencyPair> = self
            .rates
            .read()
            .iter()
            .filter(|(_, row)| row.value.is_none())
            .map(|(pair, _)| pair.clone())
            .collect();
        pairs.sort();
        Ok(pairs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tokio_test::{assert_err, assert_ok};

    fn pair(s: &str) -> CurrencyPair {
        CurrencyPair::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_ids_are_sequential() {
        let store = MemoryRateStore::new();
        let first = store.place_request(&pair("EUR/USD")).await.unwrap();
        let second = store.place_request(&pair("EUR/USD")).await.unwrap();

        assert_eq!(first, RequestId::new(1));
        assert_eq!(second, RequestId::new(2));
        assert_eq!(store.status_of(first), Some(RequestStatus::Submitted));
    }

    #[tokio::test]
    async fn test_upsert_replaces_rate() {
        let store = MemoryRateStore::new();
        let eur_usd = pair("EUR/USD");

        store.upsert_rate(&eur_usd, dec!(1.08)).await.unwrap();
        let first = store.get_rate_by_pair(&eur_usd).await.unwrap();
        store.upsert_rate(&eur_usd, dec!(1.09)).await.unwrap();
        let second = store.get_rate_by_pair(&eur_usd).await.unwrap();

        assert_eq!(first.value, dec!(1.08));
        assert_eq!(second.value, dec!(1.09));
        assert!(second.updated_at >= first.updated_at);
    }

    #[tokio::test]
    async fn test_pairs_are_directional() {
        let store = MemoryRateStore::new();
        store.upsert_rate(&pair("GBP/JPY"), dec!(189.3)).await.unwrap();

        let err = assert_err!(store.get_rate_by_pair(&pair("JPY/GBP")).await);
        assert!(matches!(err, RatesError::PairNotFound(_)));
    }

    #[tokio::test]
    async fn test_rate_by_request_id() {
        let store = MemoryRateStore::new();
        let gbp_jpy = pair("GBP/JPY");
        let id = store.place_request(&gbp_jpy).await.unwrap();

        let err = assert_err!(store.get_rate_by_request_id(id).await);
        assert!(err.is_not_found());

        store.upsert_rate(&gbp_jpy, dec!(189.3)).await.unwrap();
        let rate = assert_ok!(store.get_rate_by_request_id(id).await);
        assert_eq!(rate.value, dec!(189.3));

        let err = assert_err!(store.get_rate_by_request_id(RequestId::new(99)).await);
        assert!(matches!(err, RatesError::RequestNotFound(_)));
    }

    #[tokio::test]
    async fn test_terminal_status_is_final() {
        let store = MemoryRateStore::new();
        let id = store.place_request(&pair("EUR/USD")).await.unwrap();

        store.mark_processed(id).await.unwrap();
        store.mark_failed(id).await.unwrap();
        assert_eq!(store.status_of(id), Some(RequestStatus::Ok));

        let err = assert_err!(store.mark_failed(RequestId::new(42)).await);
        assert!(matches!(err, RatesError::RequestNotFound(_)));
    }

    #[tokio::test]
    async fn test_pairs_missing_rate() {
        let store = MemoryRateStore::with_pairs([pair("USD/JPY"), pair("EUR/USD")]);
        store.upsert_rate(&pair("USD/JPY"), dec!(151.2)).await.unwrap();

        let missing = store.pairs_missing_rate().await.unwrap();
        assert_eq!(missing, vec![pair("EUR/USD")]);

        let err = assert_err!(store.get_rate_by_pair(&pair("EUR/USD")).await);
        assert!(matches!(err, RatesError::PairNotFound(_)));
    }

    #[tokio::test]
    async fn test_fault_injection() {
        let store = MemoryRateStore::new();
        store.fail_on(StoreOp::PlaceRequest);

        let err = assert_err!(store.place_request(&pair("EUR/USD")).await);
        assert_eq!(err.error_code(), "DATABASE_ERROR");

        store.recover(StoreOp::PlaceRequest);
        assert_ok!(store.place_request(&pair("EUR/USD")).await);
        assert_eq!(store.request_count(), 1);
    }
}
