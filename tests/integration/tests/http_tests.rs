//! Request transport integration tests
//!
//! Drive a real `HttpClient` against an in-process axum stub of the API.
//!
//! Run with: cargo test -p integration-tests --test http_tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::Query;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use integration_tests::{fixtures::*, StubApi};
use kook_http::{BucketConfig, HttpClient, HttpError, RateLimiter};
use serde_json::{json, Value};

type Hits = Arc<AtomicUsize>;

fn ok(data: Value) -> (StatusCode, HeaderMap, Json<Value>) {
    (StatusCode::OK, HeaderMap::new(), Json(json!({ "code": 0, "message": "", "data": data })))
}

fn reject(status: StatusCode, code: i32, message: &str) -> (StatusCode, HeaderMap, Json<Value>) {
    (status, HeaderMap::new(), Json(json!({ "code": code, "message": message, "data": {} })))
}

/// Gateway index endpoint that fails `failures` times before succeeding
fn flaky_gateway_index(hits: Hits, failures: usize, status: StatusCode, code: i32) -> Router {
    Router::new().route(
        "/v3/gateway/index",
        get(move |Query(query): Query<HashMap<String, String>>| {
            let hits = Arc::clone(&hits);
            async move {
                let n = hits.fetch_add(1, Ordering::SeqCst);
                if n < failures {
                    let mut headers = HeaderMap::new();
                    headers.insert("x-request-id", "req-1".parse().unwrap());
                    let (status, _, body) = reject(status, code, "unavailable");
                    return (status, headers, body);
                }
                let compress = query.get("compress").cloned().unwrap_or_default();
                ok(json!({ "url": format!("wss://gateway.test/ws?compress={compress}") }))
            }
        }),
    )
}

#[tokio::test]
async fn test_retry_on_server_error_then_success() {
    let hits = Hits::default();
    let api = StubApi::start(flaky_gateway_index(
        Arc::clone(&hits),
        2,
        StatusCode::SERVICE_UNAVAILABLE,
        50300,
    ))
    .await
    .expect("Failed to start stub API");
    let client = test_client(&api.base_url());

    let url = client.gateway_url(true).await.expect("should succeed after retries");
    assert_eq!(url, "wss://gateway.test/ws?compress=1");
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_business_error_is_not_retried() {
    let hits = Hits::default();
    let api = StubApi::start(flaky_gateway_index(
        Arc::clone(&hits),
        usize::MAX,
        StatusCode::OK,
        40300,
    ))
    .await
    .unwrap();
    let client = test_client(&api.base_url());

    let err = client.gateway_url(false).await.unwrap_err();
    let api_error = err.api_error().expect("should be an API error");
    assert_eq!(api_error.code, 40300);
    assert!(api_error.is_permission_error());
    assert_eq!(api_error.request_id.as_deref(), Some("req-1"));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_retry_exhaustion_makes_max_attempts() {
    let hits = Hits::default();
    let api = StubApi::start(flaky_gateway_index(
        Arc::clone(&hits),
        usize::MAX,
        StatusCode::INTERNAL_SERVER_ERROR,
        500,
    ))
    .await
    .unwrap();
    let client = HttpClient::builder("test-token")
        .base_url(api.base_url())
        .retry_policy(fast_retry(3))
        .build()
        .unwrap();

    let err = client.gateway_url(false).await.unwrap_err();
    match &err {
        HttpError::RetryExhausted { attempts, source } => {
            assert_eq!(*attempts, 3);
            assert!(source.api_error().is_some_and(|e| e.is_server_error()));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_rate_limit_rejection_is_retried() {
    let hits = Hits::default();
    let api = StubApi::start(flaky_gateway_index(
        Arc::clone(&hits),
        1,
        StatusCode::TOO_MANY_REQUESTS,
        429,
    ))
    .await
    .unwrap();
    let client = test_client(&api.base_url());

    client.gateway_url(false).await.expect("should succeed after a rate-limit retry");
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_without_retry_makes_single_attempt() {
    let hits = Hits::default();
    let api = StubApi::start(flaky_gateway_index(
        Arc::clone(&hits),
        usize::MAX,
        StatusCode::SERVICE_UNAVAILABLE,
        50300,
    ))
    .await
    .unwrap();
    let client = HttpClient::builder("test-token")
        .base_url(api.base_url())
        .without_retry()
        .build()
        .unwrap();

    let err = client.gateway_url(false).await.unwrap_err();
    assert!(matches!(err, HttpError::Api(_)));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_headers_and_post_body() {
    let router = Router::new().route(
        "/v3/message/create",
        post(|headers: HeaderMap, Json(body): Json<Value>| async move {
            let header = |name: &str| {
                headers
                    .get(name)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string()
            };
            ok(json!({
                "authorization": header("authorization"),
                "user_agent": header("user-agent"),
                "echo": body,
            }))
        }),
    );
    let api = StubApi::start(router).await.unwrap();
    let client = HttpClient::builder("secret-token")
        .base_url(api.base_url())
        .user_agent("integration/1.0")
        .build()
        .unwrap();

    let data: Value = client
        .post("message/create", &json!({ "target_id": "c1", "content": "hi" }))
        .await
        .unwrap();

    assert_eq!(data["authorization"], "Bot secret-token");
    assert_eq!(data["user_agent"], "integration/1.0");
    assert_eq!(data["echo"]["content"], "hi");
}

#[tokio::test]
async fn test_rate_limiter_paces_requests_per_endpoint() {
    let hits = Hits::default();
    let api = StubApi::start(flaky_gateway_index(Arc::clone(&hits), 0, StatusCode::OK, 0))
        .await
        .unwrap();
    let limiter = Arc::new(RateLimiter::new(
        BucketConfig::global(),
        BucketConfig::new(2, Duration::from_millis(100)),
    ));
    let client = HttpClient::builder("test-token")
        .base_url(api.base_url())
        .rate_limiter(Arc::clone(&limiter))
        .build()
        .unwrap();

    let started = Instant::now();
    for _ in 0..4 {
        client.gateway_url(false).await.unwrap();
    }

    assert!(started.elapsed() >= Duration::from_millis(150));
    assert_eq!(hits.load(Ordering::SeqCst), 4);
    assert_eq!(limiter.bucket_count(), 1);
}
