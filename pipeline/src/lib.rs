//! Ratekeeper Pipeline
//!
//! Turns rate update requests into background work. Requests for the same
//! pair within the dedup window share one request id; everything else is
//! recorded, queued on a bounded channel and drained by a single worker that
//! fetches the rate, stores it and marks the request `ok` or `failed`.

pub mod backfill;
pub mod cache;
pub mod config;
pub mod job;
pub mod metrics;
pub mod pipeline;
pub mod queue;
pub mod state;
pub mod worker;

pub use backfill::backfill_missing_rates;
pub use cache::DedupCache;
pub use config::PipelineConfig;
pub use job::{execute, Job, RateUpdateJob};
pub use metrics::{Metrics, MetricsSnapshot, SharedMetrics};
pub use pipeline::RatePipeline;
pub use queue::{JobQueue, JobReceiver};
pub use state::WorkerState;
pub use worker::Worker;
