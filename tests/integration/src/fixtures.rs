//! Test fixtures and data generators
//!
//! Provides reusable frames, configurations and clients for integration tests.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use kook_core::{EventType, GatewayFrame};
use kook_gateway::{HeartbeatConfig, ReconnectPolicy, SessionConfig};
use kook_http::{HttpClient, RetryPolicy};
use serde_json::json;

/// Counter for unique test data
static COUNTER: AtomicU64 = AtomicU64::new(1);

/// Get a unique suffix for test data
pub fn unique_suffix() -> u64 {
    COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// A fresh session id as the gateway would issue it
pub fn unique_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Text message event frame with the given sequence
pub fn text_event(sn: u64, content: &str) -> GatewayFrame {
    GatewayFrame::event(
        sn,
        json!({
            "channel_type": "GROUP",
            "type": EventType::TEXT.0,
            "target_id": "channel-1",
            "author_id": "user-1",
            "content": content,
            "msg_id": format!("msg-{}", unique_suffix()),
            "msg_timestamp": 1_700_000_000_000_i64,
            "nonce": "",
            "extra": {},
        }),
    )
}

/// Session configuration with short timeouts and quiet heartbeats
pub fn test_session_config() -> SessionConfig {
    SessionConfig {
        compress: false,
        authorization: Some("Bot test-token".to_string()),
        heartbeat: HeartbeatConfig {
            interval: Duration::from_secs(30),
            max_failures: 3,
        },
        reconnect: ReconnectPolicy::new(3, Duration::from_millis(20)),
        connect_timeout: Duration::from_secs(2),
        handshake_timeout: Duration::from_secs(2),
        notice_capacity: 64,
    }
}

/// Retry policy with millisecond delays
pub fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::new(
        max_attempts,
        Duration::from_millis(10),
        Duration::from_millis(50),
    )
}

/// API client pointed at a stub server, with fast retries
pub fn test_client(base_url: &str) -> HttpClient {
    HttpClient::builder("test-token")
        .base_url(base_url)
        .timeout(Duration::from_secs(5))
        .retry_policy(fast_retry(4))
        .build()
        .expect("test client should build")
}
