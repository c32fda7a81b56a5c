//! Startup connection to Postgres.

use ratekeeper_common::{constants, RatesError, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use tracing::{info, warn};

/// How hard to try reaching the database at startup.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// Total attempts before giving up.
    pub attempts: u32,
    /// Pause between attempts.
    pub pause: Duration,
    /// Pool size.
    pub max_connections: u32,
    /// How long one attempt may wait for a connection.
    pub acquire_timeout: Duration,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            attempts: constants::DB_CONNECT_ATTEMPTS,
            pause: constants::DB_CONNECT_PAUSE,
            max_connections: 10,
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

/// Connect to Postgres, retrying while the server comes up.
pub async fn connect_with_retry(url: &str, options: &ConnectOptions) -> Result<PgPool> {
    let attempts = options.attempts.max(1);
    let mut last_error = String::new();

    for attempt in 1..=attempts {
        match PgPoolOptions::new()
            .max_connections(options.max_connections)
            .acquire_timeout(options.acquire_timeout)
            .connect(url)
            .await
        {
            Ok(pool) => {
                info!(attempt, "Connected to database");
                return Ok(pool);
            }
            Err(e) => {
                last_error = e.to_string();
                warn!(attempt, attempts, error = %e, "Database not reachable yet");
                if attempt < attempts {
                    tokio::time::sleep(options.pause).await;
                }
            }
        }
    }

    Err(RatesError::Database(format!(
        "failed to connect after {attempts} attempts: {last_error}"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = ConnectOptions::default();
        assert_eq!(options.attempts, 10);
        assert_eq!(options.pause, Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_gives_up_after_attempts() {
        let options = ConnectOptions {
            attempts: 2,
            pause: Duration::from_millis(10),
            max_connections: 1,
            acquire_timeout: Duration::from_millis(200),
        };

        let err = connect_with_retry("postgres://nobody@127.0.0.1:1/none", &options)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("after 2 attempts"));
    }
}
