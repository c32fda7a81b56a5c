//! Storage trait shared by the pipeline and the HTTP layer.

use async_trait::async_trait;
use ratekeeper_common::{CurrencyPair, Rate, RequestId, Result, UpdateRequest};
use rust_decimal::Decimal;
use std::sync::Arc;

/// Durable storage for rates and update requests.
///
/// Implementations must be safe for concurrent use. A request in a terminal
/// status keeps it: marking it again is a no-op.
#[async_trait]
pub trait RateStore: Send + Sync {
    /// Record a new update request in `submitted` status.
    async fn place_request(&self, pair: &CurrencyPair) -> Result<RequestId>;

    /// Insert or replace the rate for a pair, stamped with the current time.
    async fn upsert_rate(&self, pair: &CurrencyPair, rate: Decimal) -> Result<()>;

    /// Move a request to `ok`.
    async fn mark_processed(&self, id: RequestId) -> Result<()>;

    /// Move a request to `failed`.
    async fn mark_failed(&self, id: RequestId) -> Result<()>;

    /// Latest stored rate for a pair.
    async fn get_rate_by_pair(&self, pair: &CurrencyPair) -> Result<Rate>;

    /// Latest stored rate for the pair a request was placed for.
    async fn get_rate_by_request_id(&self, id: RequestId) -> Result<Rate>;

    /// The request row behind an id.
    async fn get_request(&self, id: RequestId) -> Result<UpdateRequest>;

    /// Pairs that have a rate row but no value yet.
    async fn pairs_missing_rate(&self) -> Result<Vec<CurrencyPair>>;
}

/// Shared store handle.
pub type SharedRateStore = Arc<dyn RateStore>;
