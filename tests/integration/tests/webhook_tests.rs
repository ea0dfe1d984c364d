//! Push endpoint integration tests
//!
//! Serve the real push router over HTTP and post callbacks with `reqwest`.
//!
//! Run with: cargo test -p integration-tests --test webhook_tests

use std::io::Write;
use std::sync::Arc;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use integration_tests::{wait_until, EventLog, StubApi};
use kook_core::EventDispatcher;
use kook_webhook::{
    router, SignatureVerifier, WebhookState, NONCE_HEADER, SIGNATURE_HEADER, TIMESTAMP_HEADER,
};
use reqwest::StatusCode;
use serde_json::Value;

const SECRET: &str = "verify-token";
const EVENT_BODY: &str =
    r#"{"s":0,"d":{"channel_type":"GROUP","type":1,"target_id":"c1","content":"pushed"},"sn":9}"#;

async fn start_endpoint(verify_token: Option<&str>) -> (StubApi, EventLog) {
    let dispatcher = Arc::new(EventDispatcher::new());
    let log = EventLog::attach(&dispatcher);
    let state = WebhookState::new(verify_token.map(str::to_string), dispatcher);
    let api = StubApi::start(router(state, "/webhook"))
        .await
        .expect("Failed to start push endpoint");
    (api, log)
}

fn signed_post(
    api: &StubApi,
    timestamp: i64,
    body: Vec<u8>,
) -> reqwest::RequestBuilder {
    let timestamp = timestamp.to_string();
    let signature = SignatureVerifier::new(SECRET)
        .sign(&timestamp, "nonce-42", &body)
        .unwrap();
    reqwest::Client::new()
        .post(format!("{}/webhook", api.base_url()))
        .header(TIMESTAMP_HEADER, timestamp)
        .header(NONCE_HEADER, "nonce-42")
        .header(SIGNATURE_HEADER, signature)
        .body(body)
}

#[tokio::test]
async fn test_signed_event_is_delivered() {
    let (api, log) = start_endpoint(Some(SECRET)).await;

    let response = signed_post(&api, chrono::Utc::now().timestamp(), EVENT_BODY.into())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], 0);

    assert!(wait_until(|| log.len() == 1).await);
    assert_eq!(log.contents(), vec!["pushed"]);
}

#[tokio::test]
async fn test_compressed_body_is_verified_before_inflating() {
    let (api, log) = start_endpoint(Some(SECRET)).await;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(EVENT_BODY.as_bytes()).unwrap();
    let compressed = encoder.finish().unwrap();

    let response = signed_post(&api, chrono::Utc::now().timestamp(), compressed)
        .header("content-encoding", "deflate")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(wait_until(|| log.len() == 1).await);
}

#[tokio::test]
async fn test_stale_timestamp_is_rejected() {
    let (api, log) = start_endpoint(Some(SECRET)).await;

    let response = signed_post(&api, chrono::Utc::now().timestamp() - 301, EVENT_BODY.into())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(log.is_empty());
}

#[tokio::test]
async fn test_bad_signature_is_rejected() {
    let (api, log) = start_endpoint(Some(SECRET)).await;

    let response = reqwest::Client::new()
        .post(format!("{}/webhook", api.base_url()))
        .header(TIMESTAMP_HEADER, chrono::Utc::now().timestamp().to_string())
        .header(NONCE_HEADER, "nonce-42")
        .header(SIGNATURE_HEADER, "c2lnbmF0dXJl")
        .body(EVENT_BODY)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(log.is_empty());
}

#[tokio::test]
async fn test_challenge_is_echoed() {
    let (api, log) = start_endpoint(Some(SECRET)).await;

    let body = r#"{"s":0,"d":{"type":255,"channel_type":"WEBHOOK_CHALLENGE","challenge":"ch-7"}}"#;
    let response = signed_post(&api, chrono::Utc::now().timestamp(), body.into())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let reply: Value = response.json().await.unwrap();
    assert_eq!(reply, serde_json::json!({ "challenge": "ch-7" }));
    assert!(log.is_empty());
}

#[tokio::test]
async fn test_unverified_endpoint_accepts_unsigned_requests() {
    let (api, log) = start_endpoint(None).await;

    let response = reqwest::Client::new()
        .post(format!("{}/webhook", api.base_url()))
        .body(EVENT_BODY)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(wait_until(|| log.len() == 1).await);
}
