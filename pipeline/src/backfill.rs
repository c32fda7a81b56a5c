//! Startup fill of rate rows that have no value yet.

use ratekeeper_common::{RatesError, Result};
use ratekeeper_source::RateSource;
use ratekeeper_store::RateStore;
use tracing::{info, instrument};

/// Fetch and store a rate for every pair that has a row but no value.
///
/// Stops at the first failure. Returns the number of pairs filled.
#[instrument(skip_all, fields(source = source.name()))]
pub async fn backfill_missing_rates(store: &dyn RateStore, source: &dyn RateSource) -> Result<usize> {
    let pairs = store.pairs_missing_rate().await?;
    info!(pairs = pairs.len(), "Filling missing rates");

    for pair in &pairs {
        let rate = source.fetch_rate(pair).await.map_err(RatesError::from)?;
        store.upsert_rate(pair, rate).await?;
        info!(pair = %pair, rate = %rate, "Filled missing rate");
    }

    info!(pairs = pairs.len(), "Finished filling missing rates");
    Ok(pairs.len())
}
