//! Jobs executed by the worker.

use ratekeeper_common::{CurrencyPair, RatesError, RequestId, Result};
use ratekeeper_source::SharedRateSource;
use ratekeeper_store::SharedRateStore;
use std::fmt;
use tracing::{info, instrument, warn};

/// Refresh the stored rate of one pair on behalf of one request.
pub struct RateUpdateJob {
    pub pair: CurrencyPair,
    pub request_id: RequestId,
    pub store: SharedRateStore,
    pub source: SharedRateSource,
}

impl fmt::Debug for RateUpdateJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateUpdateJob")
            .field("pair", &self.pair)
            .field("request_id", &self.request_id)
            .field("source", &self.source.name())
            .finish()
    }
}

/// Unit of work handed from the queue to the worker.
#[derive(Debug)]
pub enum Job {
    RateUpdate(RateUpdateJob),
}

impl Job {
    /// Request this job reports its outcome to.
    pub fn request_id(&self) -> RequestId {
        match self {
            Job::RateUpdate(job) => job.request_id,
        }
    }

    /// Store the outcome is written to.
    pub fn store(&self) -> SharedRateStore {
        match self {
            Job::RateUpdate(job) => job.store.clone(),
        }
    }

    /// Short name for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Job::RateUpdate(_) => "rate_update",
        }
    }
}

/// Run a job to completion.
///
/// On success the request ends `ok`; on any failure it is marked `failed`
/// before the error is returned.
pub async fn execute(job: Job) -> Result<()> {
    match job {
        Job::RateUpdate(job) => run_rate_update(job).await,
    }
}

#[instrument(skip(job), fields(pair = %job.pair, request_id = %job.request_id))]
async fn run_rate_update(job: RateUpdateJob) -> Result<()> {
    let RateUpdateJob {
        pair,
        request_id,
        store,
        source,
    } = job;

    let rate = match source.fetch_rate(&pair).await {
        Ok(rate) => rate,
        Err(e) => {
            warn!(source = source.name(), error = %e, "Rate fetch failed");
            mark_failed(&store, request_id).await;
            return Err(RatesError::from(e));
        }
    };

    if let Err(e) = store.upsert_rate(&pair, rate).await {
        warn!(error = %e, "Storing rate failed");
        mark_failed(&store, request_id).await;
        return Err(e);
    }

    store.mark_processed(request_id).await?;

    info!(rate = %rate, "Rate updated");
    Ok(())
}

/// Best-effort `failed` mark; a second error is only logged.
pub(crate) async fn mark_failed(store: &SharedRateStore, request_id: RequestId) {
    if let Err(e) = store.mark_failed(request_id).await {
        warn!(request_id = %request_id, error = %e, "Could not mark request as failed");
    }
}
