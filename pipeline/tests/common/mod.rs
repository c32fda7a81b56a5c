#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use ratekeeper_common::CurrencyPair;
use ratekeeper_pipeline::{PipelineConfig, RatePipeline};
use ratekeeper_source::MockRateSource;
use ratekeeper_store::MemoryRateStore;

pub struct Harness {
    pub pipeline: Arc<RatePipeline>,
    pub store: Arc<MemoryRateStore>,
    pub source: Arc<MockRateSource>,
}

pub fn pair(s: &str) -> CurrencyPair {
    CurrencyPair::parse(s).unwrap()
}

pub fn harness(config: PipelineConfig) -> Harness {
    let store = Arc::new(MemoryRateStore::new());
    let source = Arc::new(MockRateSource::new("mock"));
    let pipeline = RatePipeline::new(config, store.clone(), source.clone()).unwrap();

    Harness {
        pipeline: Arc::new(pipeline),
        store,
        source,
    }
}

pub fn default_harness() -> Harness {
    harness(PipelineConfig::default())
}

/// Wait until the worker has finished `count` jobs.
pub async fn wait_for_processed(pipeline: &RatePipeline, count: u64) {
    wait_until(|| pipeline.jobs_processed() >= count).await;
}

/// Poll a condition until it holds, failing the test after five seconds.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}
