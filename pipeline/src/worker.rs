//! Single background consumer of the job queue.

use parking_lot::{Mutex, RwLock};
use ratekeeper_common::{RatesError, RequestId};
use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, warn};

use crate::job::{self, Job};
use crate::metrics::SharedMetrics;
use crate::queue::JobReceiver;
use crate::state::WorkerState;

/// Drains the job queue one job at a time.
///
/// The consume loop is spawned at most once, by whichever caller reaches
/// [`ensure_started`](Self::ensure_started) first. Every job runs on its own
/// task so a panic inside it is seen as a `JoinError` and never reaches the
/// loop.
pub struct Worker {
    receiver: Mutex<Option<JobReceiver>>,
    handle: Mutex<Option<JoinHandle<()>>>,
    state: Arc<RwLock<WorkerState>>,
    processed: Arc<AtomicU64>,
    metrics: SharedMetrics,
}

impl Worker {
    /// Create a worker that has not started consuming yet.
    pub fn new(receiver: JobReceiver, metrics: SharedMetrics) -> Self {
        Self {
            receiver: Mutex::new(Some(receiver)),
            handle: Mutex::new(None),
            state: Arc::new(RwLock::new(WorkerState::Idle)),
            processed: Arc::new(AtomicU64::new(0)),
            metrics,
        }
    }

    /// Spawn the consume loop unless it already runs. Returns `true` for the
    /// call that started it.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn ensure_started(&self) -> bool {
        let Some(receiver) = self.receiver.lock().take() else {
            return false;
        };

        *self.state.write() = WorkerState::Consuming;
        let handle = tokio::spawn(consume(
            receiver,
            self.state.clone(),
            self.processed.clone(),
            self.metrics.clone(),
        ));
        *self.handle.lock() = Some(handle);

        info!("Worker started");
        true
    }

    /// Current state.
    pub fn state(&self) -> WorkerState {
        *self.state.read()
    }

    /// Jobs finished so far, whatever their outcome.
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::SeqCst)
    }

    /// Wait for the consume loop to exit. Returns immediately if it never ran.
    pub async fn join(&self) {
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!(error = %e, "Worker loop terminated abnormally");
                *self.state.write() = WorkerState::Stopped;
            }
        }
    }
}

async fn consume(
    mut receiver: JobReceiver,
    state: Arc<RwLock<WorkerState>>,
    processed: Arc<AtomicU64>,
    metrics: SharedMetrics,
) {
    loop {
        *state.write() = WorkerState::Consuming;
        let Some(job) = receiver.dequeue().await else {
            break;
        };

        *state.write() = WorkerState::Processing;
        run_contained(job, &metrics).await;
        processed.fetch_add(1, Ordering::SeqCst);
    }

    *state.write() = WorkerState::Stopped;
    info!(processed = processed.load(Ordering::SeqCst), "Worker stopped");
}

async fn run_contained(job: Job, metrics: &SharedMetrics) {
    let request_id = job.request_id();
    let kind = job.kind();
    let store = job.store();

    debug!(request_id = %request_id, kind, "Running job");
    metrics.job_started();

    match tokio::spawn(job::execute(job)).await {
        Ok(Ok(())) => metrics.job_succeeded(),
        Ok(Err(e)) => {
            warn!(request_id = %request_id, kind, error = %e, "Job failed");
            metrics.job_failed();
        }
        Err(e) => {
            let err = abort_error(request_id, e);
            if matches!(err, RatesError::JobPanicked { .. }) {
                metrics.job_panicked();
            } else {
                metrics.job_failed();
            }
            error!(request_id = %request_id, kind, error = %err, "Job aborted");
            job::mark_failed(&store, request_id).await;
        }
    }
}

fn abort_error(request_id: RequestId, e: JoinError) -> RatesError {
    if e.is_panic() {
        RatesError::JobPanicked {
            request_id,
            message: panic_message(e.into_panic()),
        }
    } else {
        RatesError::JobCancelled(request_id)
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::RateUpdateJob;
    use crate::metrics::Metrics;
    use crate::queue::JobQueue;
    use ratekeeper_common::{CurrencyPair, RequestStatus};
    use ratekeeper_source::MockRateSource;
    use ratekeeper_store::{MemoryRateStore, RateStore};
    use rust_decimal_macros::dec;
    use std::time::Duration;

    fn pair(s: &str) -> CurrencyPair {
        CurrencyPair::parse(s).unwrap()
    }

    async fn job_for(
        store: &Arc<MemoryRateStore>,
        source: &Arc<MockRateSource>,
        p: &str,
    ) -> Job {
        let request_id = store.place_request(&pair(p)).await.unwrap();
        Job::RateUpdate(RateUpdateJob {
            pair: pair(p),
            request_id,
            store: store.clone(),
            source: source.clone(),
        })
    }

    #[test]
    fn test_panic_message() {
        assert_eq!(panic_message(Box::new("boom")), "boom");
        assert_eq!(panic_message(Box::new("boom".to_string())), "boom");
        assert_eq!(panic_message(Box::new(42)), "unknown panic payload");
    }

    #[tokio::test]
    async fn test_abort_error_tells_panic_from_cancel() {
        let panicked = tokio::spawn(async { panic!("boom") }).await.unwrap_err();
        let err = abort_error(RequestId::new(1), panicked);
        assert!(matches!(
            err,
            RatesError::JobPanicked { ref message, .. } if message == "boom"
        ));

        let pending = tokio::spawn(std::future::pending::<()>());
        pending.abort();
        let cancelled = pending.await.unwrap_err();
        let err = abort_error(RequestId::new(2), cancelled);
        assert!(matches!(err, RatesError::JobCancelled(id) if id == RequestId::new(2)));
        assert_eq!(err.error_code(), "JOB_CANCELLED");
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        let (_queue, receiver) = JobQueue::bounded(1);
        let worker = Worker::new(receiver, Arc::new(Metrics::new()));
        assert_eq!(worker.state(), WorkerState::Idle);

        assert!(worker.ensure_started());
        assert!(!worker.ensure_started());
        assert!(worker.state().is_running());
    }

    #[tokio::test]
    async fn test_panic_is_contained() {
        let store = Arc::new(MemoryRateStore::new());
        let source = Arc::new(MockRateSource::new("mock"));
        source.panic_on(pair("EUR/USD"));
        source.set_rate(pair("GBP/JPY"), dec!(189.3));

        let metrics = Arc::new(Metrics::new());
        let (queue, receiver) = JobQueue::bounded(4);
        let worker = Worker::new(receiver, metrics.clone());
        worker.ensure_started();

        let panicking = job_for(&store, &source, "EUR/USD").await;
        let healthy = job_for(&store, &source, "GBP/JPY").await;
        let (first, second) = (panicking.request_id(), healthy.request_id());
        queue.enqueue(panicking).await.unwrap();
        queue.enqueue(healthy).await.unwrap();

        queue.close();
        tokio::time::timeout(Duration::from_secs(5), worker.join())
            .await
            .unwrap();

        assert_eq!(store.status_of(first), Some(RequestStatus::Failed));
        assert_eq!(store.status_of(second), Some(RequestStatus::Ok));
        assert_eq!(worker.processed(), 2);
        assert_eq!(worker.state(), WorkerState::Stopped);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.jobs_panicked, 1);
        assert_eq!(snapshot.jobs_succeeded, 1);
        assert_eq!(snapshot.jobs_active, 0);
    }
}
