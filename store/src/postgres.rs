//! Postgres-backed store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ratekeeper_common::{
    CurrencyPair, Rate, RatesError, RequestId, RequestStatus, Result, UpdateRequest,
};
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::{debug, instrument, warn};

use crate::schema;
use crate::store::RateStore;

pub(crate) fn db_error(err: sqlx::Error) -> RatesError {
    RatesError::Database(err.to_string())
}

fn to_db_id(id: RequestId) -> Result<i64> {
    i64::try_from(id.value()).map_err(|_| RatesError::RequestNotFound(id))
}

fn from_db_id(id: i64) -> Result<RequestId> {
    u64::try_from(id)
        .map(RequestId::new)
        .map_err(|_| RatesError::Database(format!("negative request id {id}")))
}

fn pair_from_row(row: &PgRow) -> Result<CurrencyPair> {
    let base: String = row.try_get("currency1").map_err(db_error)?;
    let quote: String = row.try_get("currency2").map_err(db_error)?;
    CurrencyPair::from_codes(base.trim(), quote.trim())
        .map_err(|e| RatesError::Database(format!("stored pair is invalid: {e}")))
}

/// Store backed by a Postgres connection pool.
#[derive(Clone)]
pub struct PgRateStore {
    pool: PgPool,
}

impl PgRateStore {
    /// Wrap an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Wrap a pool and create the tables if needed.
    pub async fn with_schema(pool: PgPool) -> Result<Self> {
        schema::ensure_schema(&pool).await?;
        Ok(Self::new(pool))
    }

    /// Get the underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn set_terminal_status(&self, id: RequestId, status: RequestStatus) -> Result<()> {
        let db_id = to_db_id(id)?;

        let result = sqlx::query(
            "UPDATE update_requests SET request_status = $2 \
             WHERE id = $1 AND request_status = 'submitted'",
        )
        .bind(db_id)
        .bind(status.as_str())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            let current = self.get_request(id).await?;
            warn!(
                request_id = %id,
                current = %current.status,
                requested = %status,
                "Request already terminal, status left unchanged"
            );
        }

        Ok(())
    }
}

#[async_trait]
impl RateStore for PgRateStore {
    #[instrument(skip(self), fields(pair = %pair))]
    async fn place_request(&self, pair: &CurrencyPair) -> Result<RequestId> {
        let row = sqlx::query(
            "INSERT INTO update_requests (currency1, currency2, request_status) \
             VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(pair.base.code())
        .bind(pair.quote.code())
        .bind(RequestStatus::Submitted.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;

        let id = from_db_id(row.try_get("id").map_err(db_error)?)?;
        debug!(request_id = %id, "Placed update request");
        Ok(id)
    }

    #[instrument(skip(self), fields(pair = %pair))]
    async fn upsert_rate(&self, pair: &CurrencyPair, rate: Decimal) -> Result<()> {
        sqlx::query(
            "INSERT INTO rates (currency1, currency2, rate, update_time) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (currency1, currency2) DO UPDATE \
             SET rate = EXCLUDED.rate, update_time = EXCLUDED.update_time",
        )
        .bind(pair.base.code())
        .bind(pair.quote.code())
        .bind(rate)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn mark_processed(&self, id: RequestId) -> Result<()> {
        self.set_terminal_status(id, RequestStatus::Ok).await
    }

    async fn mark_failed(&self, id: RequestId) -> Result<()> {
        self.set_terminal_status(id, RequestStatus::Failed).await
    }

    async fn get_rate_by_pair(&self, pair: &CurrencyPair) -> Result<Rate> {
        let row = sqlx::query(
            "SELECT rate, update_time FROM rates \
             WHERE currency1 = $1 AND currency2 = $2 LIMIT 1",
        )
        .bind(pair.base.code())
        .bind(pair.quote.code())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .ok_or_else(|| RatesError::PairNotFound(pair.clone()))?;

        let value: Option<Decimal> = row.try_get("rate").map_err(db_error)?;
        let updated_at: DateTime<Utc> = row.try_get("update_time").map_err(db_error)?;

        // A row without a value has never been fetched.
        let value = value.ok_or_else(|| RatesError::PairNotFound(pair.clone()))?;

        Ok(Rate {
            pair: pair.clone(),
            value,
            updated_at,
        })
    }

    async fn get_rate_by_request_id(&self, id: RequestId) -> Result<Rate> {
        let request = self.get_request(id).await?;
        self.get_rate_by_pair(&request.pair).await
    }

    async fn get_request(&self, id: RequestId) -> Result<UpdateRequest> {
        let db_id = to_db_id(id)?;

        let row = sqlx::query(
            "SELECT currency1, currency2, request_status, created_at \
             FROM update_requests WHERE id = $1",
        )
        .bind(db_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .ok_or(RatesError::RequestNotFound(id))?;

        let status: String = row.try_get("request_status").map_err(db_error)?;

        Ok(UpdateRequest {
            id,
            pair: pair_from_row(&row)?,
            status: status.parse()?,
            created_at: row.try_get("created_at").map_err(db_error)?,
        })
    }

    async fn pairs_missing_rate(&self) -> Result<Vec<CurrencyPair>> {
        let rows = sqlx::query(
            "SELECT currency1, currency2 FROM rates WHERE rate IS NULL \
             ORDER BY currency1, currency2",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.iter().map(pair_from_row).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_conversion() {
        assert_eq!(to_db_id(RequestId::new(42)).unwrap(), 42);
        assert!(matches!(
            to_db_id(RequestId::new(u64::MAX)),
            Err(RatesError::RequestNotFound(_))
        ));
        assert_eq!(from_db_id(7).unwrap(), RequestId::new(7));
        assert!(from_db_id(-1).is_err());
    }

    #[test]
    fn test_db_error_mapping() {
        let err = db_error(sqlx::Error::RowNotFound);
        assert_eq!(err.error_code(), "DATABASE_ERROR");
        assert!(!err.is_not_found());
    }
}
