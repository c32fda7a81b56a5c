use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use ratekeeper_common::CurrencyPair;
use ratekeeper_pipeline::{PipelineConfig, RatePipeline};
use ratekeeper_server::{api::app_router, AppState};
use ratekeeper_source::MockRateSource;
use ratekeeper_store::{MemoryRateStore, StoreOp};
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tower::ServiceExt;

struct TestApp {
    router: Router,
    pipeline: Arc<RatePipeline>,
    store: Arc<MemoryRateStore>,
    source: Arc<MockRateSource>,
}

fn pair(s: &str) -> CurrencyPair {
    CurrencyPair::parse(s).unwrap()
}

fn test_app() -> TestApp {
    let store = Arc::new(MemoryRateStore::new());
    let source = Arc::new(MockRateSource::new("mock"));
    source.set_rate(pair("GBP/JPY"), dec!(189.3));

    let pipeline = Arc::new(
        RatePipeline::new(PipelineConfig::default(), store.clone(), source.clone()).unwrap(),
    );
    let router = app_router(AppState::new(pipeline.clone()));

    TestApp {
        router,
        pipeline,
        store,
        source,
    }
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or_else(|_| {
        Value::String(String::from_utf8_lossy(&bytes).into_owned())
    });
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn wait_for_processed(pipeline: &RatePipeline, count: u64) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while pipeline.jobs_processed() < count {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn root_greets_client() {
    let app = test_app();
    let (status, body) = send(&app.router, get("/")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("Hello client!".to_string()));
}

#[tokio::test]
async fn update_then_read_rate() {
    let app = test_app();

    let (status, body) = send(
        &app.router,
        post_json("/rates/update_requests", json!({ "pair": "GBP/JPY" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let id = body["update_request_id"].as_u64().unwrap();
    wait_for_processed(&app.pipeline, 1).await;

    let (status, body) = send(&app.router, get("/rates?currency_pair=GBP/JPY")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rate"], json!(189.3));
    assert!(body["update_time"].is_string());

    let (status, body) = send(&app.router, get(&format!("/rates/update_requests/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["update_request_id"], json!(id));
    assert_eq!(body["pair"], "GBP/JPY");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["rate"], json!(189.3));
}

#[tokio::test]
async fn currency_pair_alias_is_accepted() {
    let app = test_app();

    let (status, first) = send(
        &app.router,
        post_json("/rates/update_requests", json!({ "currency_pair": "gbp/jpy" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, second) = send(
        &app.router,
        post_json("/rates/update_requests", json!({ "pair": "GBP/JPY" })),
    )
    .await;
    assert_eq!(first["update_request_id"], second["update_request_id"]);
}

#[tokio::test]
async fn pending_request_has_no_rate_fields() {
    let app = test_app();
    app.source.close_gate();

    let (_, body) = send(
        &app.router,
        post_json("/rates/update_requests", json!({ "pair": "EUR/USD" })),
    )
    .await;
    let id = body["update_request_id"].as_u64().unwrap();

    let (status, body) = send(&app.router, get(&format!("/rates/update_requests/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "submitted");
    assert!(body.get("rate").is_none());
    assert!(body.get("update_time").is_none());

    app.source.open_gate();
}

#[tokio::test]
async fn failed_update_is_reported() {
    let app = test_app();

    let (_, body) = send(
        &app.router,
        post_json("/rates/update_requests", json!({ "pair": "XXX/YYY" })),
    )
    .await;
    let id = body["update_request_id"].as_u64().unwrap();
    wait_for_processed(&app.pipeline, 1).await;

    let (_, body) = send(&app.router, get(&format!("/rates/update_requests/{id}"))).await;
    assert_eq!(body["status"], "failed");

    let (status, body) = send(&app.router, get("/rates?currency_pair=XXX/YYY")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 404);
}

#[tokio::test]
async fn rate_query_validation() {
    let app = test_app();

    let (status, body) = send(&app.router, get("/rates")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);

    let (status, _) = send(&app.router, get("/rates?currency_pair=EURUSD")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app.router, get("/rates?currency_pair=EU1/USD")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app.router, get("/rates?currency_pair=EUR/USD")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_request_validation() {
    let app = test_app();

    let no_content_type = Request::builder()
        .method(Method::POST)
        .uri("/rates/update_requests")
        .body(Body::from(r#"{"pair":"EUR/USD"}"#))
        .unwrap();
    let (status, _) = send(&app.router, no_content_type).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let malformed = Request::builder()
        .method(Method::POST)
        .uri("/rates/update_requests")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, _) = send(&app.router, malformed).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    for body in [json!({}), json!({ "pair": "" }), json!({ "pair": "EUR-USD" })] {
        let (status, _) = send(&app.router, post_json("/rates/update_requests", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    assert_eq!(app.store.request_count(), 0);
}

#[tokio::test]
async fn update_request_lookup_errors() {
    let app = test_app();

    let (status, _) = send(&app.router, get("/rates/update_requests/abc")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app.router, get("/rates/update_requests/-1")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app.router, get("/rates/update_requests/999")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "No update request with id 999");
}

#[tokio::test]
async fn storage_failure_is_internal_error() {
    let app = test_app();
    app.store.fail_on(StoreOp::PlaceRequest);

    let (status, body) = send(
        &app.router,
        post_json("/rates/update_requests", json!({ "pair": "EUR/USD" })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], 500);

    app.store.fail_on(StoreOp::Read);
    let (status, _) = send(&app.router, get("/rates?currency_pair=EUR/USD")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn metrics_are_exported() {
    let app = test_app();
    send(
        &app.router,
        post_json("/rates/update_requests", json!({ "pair": "GBP/JPY" })),
    )
    .await;
    wait_for_processed(&app.pipeline, 1).await;

    let (status, body) = send(&app.router, get("/metrics")).await;
    assert_eq!(status, StatusCode::OK);
    let text = body.as_str().unwrap();
    assert!(text.contains("ratekeeper_submits_total 1"));
    assert!(text.contains("ratekeeper_jobs_succeeded 1"));
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let app = test_app();
    let (status, body) = send(&app.router, get("/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 404);
}
