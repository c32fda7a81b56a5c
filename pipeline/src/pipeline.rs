//! Entry point used by the request handling layer.

use dashmap::DashMap;
use ratekeeper_common::{CurrencyPair, Rate, RatesError, RequestId, Result, UpdateRequest};
use ratekeeper_source::SharedRateSource;
use ratekeeper_store::SharedRateStore;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, instrument, warn, Instrument};

use crate::cache::DedupCache;
use crate::config::PipelineConfig;
use crate::job::{Job, RateUpdateJob};
use crate::metrics::{Metrics, MetricsSnapshot, SharedMetrics};
use crate::queue::JobQueue;
use crate::state::WorkerState;
use crate::worker::Worker;

type PairLocks = DashMap<CurrencyPair, Arc<Mutex<()>>>;

/// The rate update pipeline.
///
/// Owns the dedup cache, the job queue and the worker. Share it as
/// `Arc<RatePipeline>`.
pub struct RatePipeline {
    config: PipelineConfig,
    store: SharedRateStore,
    source: SharedRateSource,
    cache: Arc<DedupCache>,
    queue: Arc<JobQueue>,
    worker: Arc<Worker>,
    metrics: SharedMetrics,
    pair_locks: Arc<PairLocks>,
}

/// Handles needed to admit one submission, owned by its task.
struct Intake {
    store: SharedRateStore,
    source: SharedRateSource,
    cache: Arc<DedupCache>,
    queue: Arc<JobQueue>,
    worker: Arc<Worker>,
    metrics: SharedMetrics,
}

impl RatePipeline {
    /// Build a pipeline. With `eager_worker_start` this spawns the worker, so
    /// it must then be called from within a Tokio runtime.
    pub fn new(
        config: PipelineConfig,
        store: SharedRateStore,
        source: SharedRateSource,
    ) -> Result<Self> {
        config.validate().map_err(RatesError::Configuration)?;

        let metrics = Arc::new(Metrics::new());
        let (queue, receiver) = JobQueue::bounded(config.queue_capacity);
        let worker = Worker::new(receiver, metrics.clone());

        let pipeline = Self {
            cache: Arc::new(DedupCache::new(config.cache_ttl)),
            config,
            store,
            source,
            queue: Arc::new(queue),
            worker: Arc::new(worker),
            metrics,
            pair_locks: Arc::new(DashMap::new()),
        };

        if pipeline.config.eager_worker_start {
            pipeline.worker.ensure_started();
        }

        info!(
            cache_ttl_secs = pipeline.config.cache_ttl.as_secs(),
            queue_capacity = pipeline.config.queue_capacity,
            strict_dedup = pipeline.config.strict_dedup,
            source = pipeline.source.name(),
            "Rate pipeline ready"
        );
        Ok(pipeline)
    }

    /// Request a rate update for a pair.
    ///
    /// Returns the id of a request placed within the dedup window if there is
    /// one. Otherwise records a new request, queues its job (waiting while
    /// the queue is full) and returns the new id.
    ///
    /// Admission runs on its own task. Dropping the returned future does not
    /// stop it, so a placed request is always queued or marked failed.
    #[instrument(skip(self), fields(pair = %pair))]
    pub async fn submit(&self, pair: CurrencyPair) -> Result<RequestId> {
        let guard = self.pair_guard(&pair).await;
        let intake = self.intake();
        let pair_locks = Arc::clone(&self.pair_locks);

        let admission = tokio::spawn(
            async move {
                let outcome = intake.admit(pair.clone()).await;
                if let Some(guard) = guard {
                    drop(guard);
                    release_pair_lock(&pair_locks, &pair);
                }
                outcome
            }
            .in_current_span(),
        );

        admission
            .await
            .map_err(|e| RatesError::Internal(format!("update request admission aborted: {e}")))?
    }

    fn intake(&self) -> Intake {
        Intake {
            store: self.store.clone(),
            source: self.source.clone(),
            cache: self.cache.clone(),
            queue: self.queue.clone(),
            worker: self.worker.clone(),
            metrics: self.metrics.clone(),
        }
    }

    async fn pair_guard(&self, pair: &CurrencyPair) -> Option<OwnedMutexGuard<()>> {
        if !self.config.strict_dedup {
            return None;
        }

        let lock = Arc::clone(&self.pair_locks.entry(pair.clone()).or_default());
        Some(lock.lock_owned().await)
    }

    /// Latest stored rate for a pair.
    pub async fn rate_by_pair(&self, pair: &CurrencyPair) -> Result<Rate> {
        self.store.get_rate_by_pair(pair).await
    }

    /// The update request behind an id.
    pub async fn update_request(&self, id: RequestId) -> Result<UpdateRequest> {
        self.store.get_request(id).await
    }

    /// Latest stored rate for the pair of an update request.
    pub async fn rate_by_request(&self, id: RequestId) -> Result<Rate> {
        self.store.get_rate_by_request_id(id).await
    }

    /// Stop accepting work and wait until queued jobs are done.
    pub async fn shutdown(&self) {
        info!(pending = self.queue.len(), "Shutting down rate pipeline");
        self.queue.close();
        self.worker.join().await;
    }

    /// Metrics snapshot including the current queue depth.
    pub fn metrics(&self) -> MetricsSnapshot {
        let mut snapshot = self.metrics.snapshot();
        snapshot.queue_depth = self.queue.len() as u64;
        snapshot
    }

    /// Current worker state.
    pub fn worker_state(&self) -> WorkerState {
        self.worker.state()
    }

    /// Jobs the worker has finished.
    pub fn jobs_processed(&self) -> u64 {
        self.worker.processed()
    }

    /// Jobs waiting in the queue.
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Get the configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }
}

impl Intake {
    async fn admit(&self, pair: CurrencyPair) -> Result<RequestId> {
        if let Some(request_id) = self.cache.get(&pair) {
            debug!(request_id = %request_id, "Reusing recent update request");
            self.metrics.submit_deduplicated();
            return Ok(request_id);
        }

        match self.place_and_enqueue(pair).await {
            Ok(request_id) => {
                self.metrics.submit_enqueued();
                Ok(request_id)
            }
            Err(e) => {
                warn!(error = %e, "Update request rejected");
                self.metrics.submit_failed();
                Err(e)
            }
        }
    }

    async fn place_and_enqueue(&self, pair: CurrencyPair) -> Result<RequestId> {
        let request_id = self.store.place_request(&pair).await?;

        let job = Job::RateUpdate(RateUpdateJob {
            pair: pair.clone(),
            request_id,
            store: self.store.clone(),
            source: self.source.clone(),
        });

        self.worker.ensure_started();
        if let Err(e) = self.queue.enqueue(job).await {
            crate::job::mark_failed(&self.store, request_id).await;
            return Err(e);
        }

        self.cache.set(pair, request_id);
        info!(request_id = %request_id, "Update request queued");
        Ok(request_id)
    }
}

/// Drop the pair's lock entry once no submitter holds or awaits it.
fn release_pair_lock(locks: &PairLocks, pair: &CurrencyPair) {
    locks.remove_if(pair, |_, lock| Arc::strong_count(lock) == 1);
}
