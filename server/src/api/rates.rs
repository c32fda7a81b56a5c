use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use ratekeeper_common::{CurrencyPair, Rate, RequestId, RequestStatus};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RateQuery {
    currency_pair: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RateResponse {
    #[serde(with = "rust_decimal::serde::float")]
    pub rate: Decimal,
    pub update_time: DateTime<Utc>,
}

impl From<Rate> for RateResponse {
    fn from(rate: Rate) -> Self {
        Self {
            rate: rate.value,
            update_time: rate.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateRequestBody {
    #[serde(alias = "currency_pair")]
    pair: String,
}

#[derive(Debug, Serialize)]
pub struct UpdateRequestCreated {
    pub update_request_id: RequestId,
}

#[derive(Debug, Serialize)]
pub struct UpdateRequestView {
    pub update_request_id: RequestId,
    pub pair: String,
    pub status: RequestStatus,
    #[serde(
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub rate: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_time: Option<DateTime<Utc>>,
}

fn parse_pair(raw: &str) -> ApiResult<CurrencyPair> {
    if raw.trim().is_empty() {
        return Err(ApiError::BadRequest("currency pair is empty".to_string()));
    }
    Ok(CurrencyPair::parse(raw.trim())?)
}

async fn get_rate(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RateQuery>,
) -> ApiResult<Json<RateResponse>> {
    let raw = query.currency_pair.ok_or_else(|| {
        ApiError::BadRequest("missing 'currency_pair' query parameter".to_string())
    })?;
    let pair = parse_pair(&raw)?;

    let rate = state.pipeline.rate_by_pair(&pair).await?;
    Ok(Json(rate.into()))
}

async fn create_update_request(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<UpdateRequestBody>, JsonRejection>,
) -> ApiResult<Json<UpdateRequestCreated>> {
    let Json(body) = payload.map_err(|rejection| match rejection {
        JsonRejection::MissingJsonContentType(e) => ApiError::UnsupportedMediaType(e.body_text()),
        other => ApiError::BadRequest(other.body_text()),
    })?;
    let pair = parse_pair(&body.pair)?;

    let id = state.pipeline.submit(pair.clone()).await?;
    info!(pair = %pair, request_id = %id, "Update request accepted");
    Ok(Json(UpdateRequestCreated {
        update_request_id: id,
    }))
}

async fn get_update_request(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> ApiResult<Json<UpdateRequestView>> {
    let id: RequestId = raw_id
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid update request id '{raw_id}'")))?;

    let request = state.pipeline.update_request(id).await?;

    let rate = match state.pipeline.rate_by_pair(&request.pair).await {
        Ok(rate) => Some(rate),
        Err(e) if e.is_not_found() => None,
        Err(e) => return Err(e.into()),
    };

    Ok(Json(UpdateRequestView {
        update_request_id: request.id,
        pair: request.pair.to_string(),
        status: request.status,
        rate: rate.as_ref().map(|r| r.value),
        update_time: rate.map(|r| r.updated_at),
    }))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/rates", get(get_rate))
        .route("/rates/update_requests", post(create_update_request))
        .route("/rates/update_requests/{id}", get(get_update_request))
}
