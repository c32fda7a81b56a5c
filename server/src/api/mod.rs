//! HTTP routes.

pub mod rates;

use std::any::Any;
use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use crate::error::{error_response, ApiError};
use crate::state::AppState;

async fn hello() -> &'static str {
    "Hello client!"
}

async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let body = state.pipeline.metrics().to_prometheus();
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
}

async fn not_found() -> ApiError {
    ApiError::NotFound("Not Found".to_string())
}

fn handle_panic(_payload: Box<dyn Any + Send + 'static>) -> Response {
    tracing::error!("Request handler panicked");
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal server error".to_string(),
    )
}

pub fn app_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(hello))
        .route("/metrics", get(metrics))
        .merge(rates::router())
        .fallback(not_found)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
