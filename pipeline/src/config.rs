//! Pipeline configuration.

use ratekeeper_common::constants;
use std::time::Duration;

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// How long a request id is handed out again for the same pair.
    pub cache_ttl: Duration,
    /// Jobs that can wait in the queue before `submit` blocks.
    pub queue_capacity: usize,
    /// Serialize submissions per pair so concurrent submits never both miss.
    pub strict_dedup: bool,
    /// Start the worker when the pipeline is built instead of on first submit.
    pub eager_worker_start: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cache_ttl: constants::CACHE_TTL,
            queue_capacity: constants::QUEUE_CAPACITY,
            strict_dedup: false,
            eager_worker_start: true,
        }
    }
}

impl PipelineConfig {
    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.queue_capacity == 0 {
            return Err("Queue capacity cannot be 0".to_string());
        }

        if self.cache_ttl.is_zero() {
            return Err("Cache TTL cannot be 0".to_string());
        }

        Ok(())
    }
}
