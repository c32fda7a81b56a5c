//! Database schema.

use sqlx::PgPool;
use tracing::info;

use crate::postgres::db_error;
use ratekeeper_common::Result;

/// Rates table, one row per directional pair. `rate` stays NULL until the
/// first successful fetch.
pub const CREATE_RATES: &str = r#"
CREATE TABLE IF NOT EXISTS rates (
    currency1   CHAR(3)     NOT NULL,
    currency2   CHAR(3)     NOT NULL,
    rate        NUMERIC     NULL,
    update_time TIMESTAMPTZ NOT NULL DEFAULT now(),
    PRIMARY KEY (currency1, currency2)
)
"#;

/// Update requests table.
pub const CREATE_UPDATE_REQUESTS: &str = r#"
CREATE TABLE IF NOT EXISTS update_requests (
    id             BIGSERIAL   PRIMARY KEY,
    currency1      CHAR(3)     NOT NULL,
    currency2      CHAR(3)     NOT NULL,
    request_status TEXT        NOT NULL DEFAULT 'submitted',
    created_at     TIMESTAMPTZ NOT NULL DEFAULT now()
)
"#;

/// Create the tables if they are missing.
pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
    for statement in [CREATE_RATES, CREATE_UPDATE_REQUESTS] {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(db_error)?;
    }
    info!("Database schema ready");
    Ok(())
}
