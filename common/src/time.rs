//! Timing constants and time helpers.

use chrono::{DateTime, Utc};

/// Service timing and sizing defaults.
pub mod constants {
    use std::time::Duration;

    /// Window during which repeated update requests for a pair share one id.
    pub const CACHE_TTL: Duration = Duration::from_secs(30);

    /// Capacity of the update job queue.
    pub const QUEUE_CAPACITY: usize = 200;

    /// Attempts to reach the database at startup.
    pub const DB_CONNECT_ATTEMPTS: u32 = 10;

    /// Pause between database connection attempts.
    pub const DB_CONNECT_PAUSE: Duration = Duration::from_secs(2);

    /// Request timeout for the external rate source.
    pub const SOURCE_TIMEOUT: Duration = Duration::from_secs(10);
}

/// A timestamp, always UTC.
pub type Timestamp = DateTime<Utc>;

/// Get the current timestamp.
pub fn now() -> Timestamp {
    Utc::now()
}
