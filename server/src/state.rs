//! Shared application state and its construction.

use std::sync::Arc;

use anyhow::Context;
use ratekeeper_pipeline::{backfill_missing_rates, RatePipeline};
use ratekeeper_source::{FakeRateSource, FrankfurterSource, SharedRateSource};
use ratekeeper_store::{connect_with_retry, MemoryRateStore, PgRateStore, SharedRateStore};
use tracing::info;

use crate::config::ServerConfig;

/// State shared by all handlers.
pub struct AppState {
    pub pipeline: Arc<RatePipeline>,
}

impl AppState {
    /// Wrap a pipeline.
    pub fn new(pipeline: Arc<RatePipeline>) -> Arc<Self> {
        Arc::new(Self { pipeline })
    }
}

/// Connect storage and the rate source, fill missing rates and start the
/// pipeline.
pub async fn build_state(config: &ServerConfig) -> anyhow::Result<Arc<AppState>> {
    let source: SharedRateSource = if config.fake_source {
        info!("Using fake rate source");
        Arc::new(FakeRateSource::new())
    } else {
        info!(url = %config.source_url, "Using Frankfurter rate source");
        Arc::new(FrankfurterSource::new(config.source()).context("building rate source")?)
    };

    let store: SharedRateStore = if config.in_memory {
        info!("Using in-memory store");
        Arc::new(MemoryRateStore::new())
    } else {
        let pool = connect_with_retry(&config.database_url, &config.connect_options())
            .await
            .context("connecting to database")?;
        Arc::new(
            PgRateStore::with_schema(pool)
                .await
                .context("preparing database schema")?,
        )
    };

    let filled = backfill_missing_rates(store.as_ref(), source.as_ref())
        .await
        .context("filling missing rates")?;
    info!(filled, "Startup backfill done");

    let pipeline = RatePipeline::new(config.pipeline(), store, source)
        .context("starting rate pipeline")?;

    Ok(AppState::new(Arc::new(pipeline)))
}
