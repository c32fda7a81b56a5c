//! Load generator firing random update requests.

use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use ratekeeper_common::{Currency, CurrencyPair};
use tracing::{info, warn};

use crate::api::RatesClient;
use crate::metrics::LoadMetrics;

const CURRENCIES: [&str; 8] = ["EUR", "USD", "GBP", "JPY", "CHF", "MXN", "CAD", "AUD"];

/// Load run parameters.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Update requests to send.
    pub requests: usize,
    /// Requests in flight at once.
    pub concurrency: usize,
    /// Random seed for reproducible pair sequences.
    pub seed: Option<u64>,
}

/// Outcome of a load run.
#[derive(Debug, Clone)]
pub struct LoadReport {
    pub metrics: LoadMetrics,
    pub elapsed: Duration,
}

/// Pick a random pair of two distinct currencies.
pub fn random_pair(rng: &mut StdRng) -> anyhow::Result<CurrencyPair> {
    let mut codes = CURRENCIES.choose_multiple(rng, 2);
    match (codes.next(), codes.next()) {
        (Some(base), Some(quote)) => Ok(CurrencyPair::new(Currency::new(base)?, Currency::new(quote)?)),
        _ => anyhow::bail!("not enough currencies to build a pair"),
    }
}

/// Generate `count` pairs from a seed, or from entropy without one.
pub fn pair_sequence(count: usize, seed: Option<u64>) -> anyhow::Result<Vec<CurrencyPair>> {
    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };
    (0..count).map(|_| random_pair(&mut rng)).collect()
}

/// Send update requests with bounded concurrency and collect latencies.
pub async fn run_load(client: &RatesClient, options: &LoadOptions) -> anyhow::Result<LoadReport> {
    let pairs = pair_sequence(options.requests, options.seed)?;
    info!(
        requests = options.requests,
        concurrency = options.concurrency,
        "Starting load run"
    );

    let started = Instant::now();
    let outcomes: Vec<_> = stream::iter(pairs)
        .map(|pair| {
            let client = client.clone();
            async move {
                let body = serde_json::json!({ "pair": pair.to_string() }).to_string();
                let sent = Instant::now();
                let result = client.post_update(&body).await;
                (pair, result, sent.elapsed())
            }
        })
        .buffer_unordered(options.concurrency.max(1))
        .collect()
        .await;
    let elapsed = started.elapsed();

    let mut metrics = LoadMetrics::new();
    for (pair, result, latency) in outcomes {
        match result {
            Ok(response) if response.is_success() => metrics.record_success(latency),
            Ok(response) => {
                warn!(pair = %pair, status = response.status, "Update request rejected");
                metrics.record_failure();
            }
            Err(e) => {
                warn!(pair = %pair, error = %e, "Update request failed");
                metrics.record_failure();
            }
        }
    }

    Ok(LoadReport { metrics, elapsed })
}
