//! Dedup cache mapping a pair to its most recent update request.

use parking_lot::Mutex;
use ratekeeper_common::{CurrencyPair, RequestId};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    request_id: RequestId,
    created_at: Instant,
}

impl CacheEntry {
    fn new(request_id: RequestId) -> Self {
        Self {
            request_id,
            created_at: Instant::now(),
        }
    }

    fn is_valid(&self, ttl: Duration) -> bool {
        // An entry exactly `ttl` old still counts.
        self.created_at.elapsed() <= ttl
    }
}

/// Pair to request id map with a fixed TTL.
///
/// Entries expire lazily on read and are never purged. One lock guards the
/// whole map and is held only for the duration of a call.
pub struct DedupCache {
    entries: Mutex<HashMap<CurrencyPair, CacheEntry>>,
    ttl: Duration,
}

impl DedupCache {
    /// Create an empty cache.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Request id recorded for the pair, unless absent or older than the TTL.
    pub fn get(&self, pair: &CurrencyPair) -> Option<RequestId> {
        let entries = self.entries.lock();
        match entries.get(pair) {
            Some(entry) if entry.is_valid(self.ttl) => {
                debug!(pair = %pair, request_id = %entry.request_id, "Dedup cache hit");
                Some(entry.request_id)
            }
            Some(_) => {
                debug!(pair = %pair, "Dedup cache entry expired");
                None
            }
            None => None,
        }
    }

    /// Record a request id for the pair, replacing any previous entry.
    pub fn set(&self, pair: CurrencyPair, request_id: RequestId) {
        self.entries.lock().insert(pair, CacheEntry::new(request_id));
    }

    /// Number of entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Check if the cache has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Configured TTL.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(s: &str) -> CurrencyPair {
        CurrencyPair::parse(s).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let cache = DedupCache::new(Duration::from_secs(30));
        cache.set(pair("EUR/USD"), RequestId::new(7));

        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(cache.get(&pair("EUR/USD")), Some(RequestId::new(7)));

        tokio::time::advance(Duration::from_secs(20)).await;
        assert_eq!(cache.get(&pair("EUR/USD")), Some(RequestId::new(7)));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cache.get(&pair("EUR/USD")), None);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_refreshes_timestamp() {
        let cache = DedupCache::new(Duration::from_secs(30));
        cache.set(pair("EUR/USD"), RequestId::new(1));

        tokio::time::advance(Duration::from_secs(25)).await;
        cache.set(pair("EUR/USD"), RequestId::new(2));

        tokio::time::advance(Duration::from_secs(25)).await;
        assert_eq!(cache.get(&pair("EUR/USD")), Some(RequestId::new(2)));
    }

    #[test]
    fn test_pairs_are_independent() {
        let cache = DedupCache::new(Duration::from_secs(30));
        cache.set(pair("EUR/USD"), RequestId::new(1));

        assert_eq!(cache.get(&pair("USD/EUR")), None);
        assert_eq!(cache.get(&pair("GBP/JPY")), None);
        assert!(!cache.is_empty());
    }
}
