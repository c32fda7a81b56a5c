//! Metrics collection for pipeline monitoring.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Pipeline metrics.
pub struct Metrics {
    /// Total submit calls that returned an id.
    pub submits_total: AtomicU64,
    /// Submits answered from the dedup cache.
    pub submits_deduplicated: AtomicU64,
    /// Submits that failed.
    pub submits_failed: AtomicU64,
    /// Jobs put on the queue.
    pub jobs_enqueued: AtomicU64,
    /// Jobs that completed successfully.
    pub jobs_succeeded: AtomicU64,
    /// Jobs that returned an error.
    pub jobs_failed: AtomicU64,
    /// Jobs that panicked.
    pub jobs_panicked: AtomicU64,
    /// Jobs currently running.
    pub jobs_active: AtomicU64,
}

impl Metrics {
    /// Create new metrics instance.
    pub fn new() -> Self {
        Self {
            submits_total: AtomicU64::new(0),
            submits_deduplicated: AtomicU64::new(0),
            submits_failed: AtomicU64::new(0),
            jobs_enqueued: AtomicU64::new(0),
            jobs_succeeded: AtomicU64::new(0),
            jobs_failed: AtomicU64::new(0),
            jobs_panicked: AtomicU64::new(0),
            jobs_active: AtomicU64::new(0),
        }
    }

    /// Record a submit served from the cache.
    pub fn submit_deduplicated(&self) {
        self.submits_total.fetch_add(1, Ordering::Relaxed);
        self.submits_deduplicated.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a submit that queued a new job.
    pub fn submit_enqueued(&self) {
        self.submits_total.fetch_add(1, Ordering::Relaxed);
        self.jobs_enqueued.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed submit.
    pub fn submit_failed(&self) {
        self.submits_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a job starting.
    pub fn job_started(&self) {
        self.jobs_active.fetch_add(1, Ordering::Relaxed);
    }

    /// Record job success.
    pub fn job_succeeded(&self) {
        self.jobs_succeeded.fetch_add(1, Ordering::Relaxed);
        self.jobs_active.fetch_sub(1, Ordering::Relaxed);
    }

    /// Record job failure.
    pub fn job_failed(&self) {
        self.jobs_failed.fetch_add(1, Ordering::Relaxed);
        self.jobs_active.fetch_sub(1, Ordering::Relaxed);
    }

    /// Record a job panic.
    pub fn job_panicked(&self) {
        self.jobs_panicked.fetch_add(1, Ordering::Relaxed);
        self.jobs_active.fetch_sub(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            submits_total: self.submits_total.load(Ordering::Relaxed),
            submits_deduplicated: self.submits_deduplicated.load(Ordering::Relaxed),
            submits_failed: self.submits_failed.load(Ordering::Relaxed),
            jobs_enqueued: self.jobs_enqueued.load(Ordering::Relaxed),
            jobs_succeeded: self.jobs_succeeded.load(Ordering::Relaxed),
            jobs_failed: self.jobs_failed.load(Ordering::Relaxed),
            jobs_panicked: self.jobs_panicked.load(Ordering::Relaxed),
            jobs_active: self.jobs_active.load(Ordering::Relaxed),
            queue_depth: 0,
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time.
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    pub submits_total: u64,
    pub submits_deduplicated: u64,
    pub submits_failed: u64,
    pub jobs_enqueued: u64,
    pub jobs_succeeded: u64,
    pub jobs_failed: u64,
    pub jobs_panicked: u64,
    pub jobs_active: u64,
    /// Jobs waiting in the queue. Filled in by the pipeline.
    pub queue_depth: u64,
}

impl MetricsSnapshot {
    /// Export metrics in Prometheus format.
    pub fn to_prometheus(&self) -> String {
        format!(
            r#"# HELP ratekeeper_submits_total Total update requests accepted
# TYPE ratekeeper_submits_total counter
ratekeeper_submits_total {}

# HELP ratekeeper_submits_deduplicated Update requests answered from the dedup cache
# TYPE ratekeeper_submits_deduplicated counter
ratekeeper_submits_deduplicated {}

# HELP ratekeeper_submits_failed Update requests that could not be accepted
# TYPE ratekeeper_submits_failed counter
ratekeeper_submits_failed {}

# HELP ratekeeper_jobs_enqueued Total jobs queued
# TYPE ratekeeper_jobs_enqueued counter
ratekeeper_jobs_enqueued {}

# HELP ratekeeper_jobs_succeeded Total successful jobs
# TYPE ratekeeper_jobs_succeeded counter
ratekeeper_jobs_succeeded {}

# HELP ratekeeper_jobs_failed Total failed jobs
# TYPE ratekeeper_jobs_failed counter
ratekeeper_jobs_failed {}

# HELP ratekeeper_jobs_panicked Total jobs that panicked
# TYPE ratekeeper_jobs_panicked counter
ratekeeper_jobs_panicked {}

# HELP ratekeeper_jobs_active Current running jobs
# TYPE ratekeeper_jobs_active gauge
ratekeeper_jobs_active {}

# HELP ratekeeper_queue_depth Current jobs waiting in the queue
# TYPE ratekeeper_queue_depth gauge
ratekeeper_queue_depth {}
"#,
            self.submits_total,
            self.submits_deduplicated,
            self.submits_failed,
            self.jobs_enqueued,
            self.jobs_succeeded,
            self.jobs_failed,
            self.jobs_panicked,
            self.jobs_active,
            self.queue_depth,
        )
    }
}

/// Shared metrics instance.
pub type SharedMetrics = Arc<Metrics>;
