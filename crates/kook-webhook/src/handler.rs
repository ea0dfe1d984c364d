//! Push callback handler

use crate::error::{WebhookError, WebhookResult};
use crate::verify::SignatureVerifier;
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap},
    Json,
};
use flate2::read::{GzDecoder, ZlibDecoder};
use kook_core::{Event, EventDispatcher, SignalKind};
use serde::Deserialize;
use serde_json::{json, Value};
use std::io::Read;
use std::sync::Arc;

pub const TIMESTAMP_HEADER: &str = "x-kook-request-timestamp";
pub const NONCE_HEADER: &str = "x-kook-request-nonce";
pub const SIGNATURE_HEADER: &str = "x-kook-signature";

/// Shared state for the push endpoint
#[derive(Clone)]
pub struct WebhookState {
    verifier: Option<Arc<SignatureVerifier>>,
    dispatcher: Arc<EventDispatcher>,
}

impl WebhookState {
    /// Without a verify token every request is accepted unauthenticated
    pub fn new(verify_token: Option<String>, dispatcher: Arc<EventDispatcher>) -> Self {
        Self {
            verifier: verify_token
                .filter(|token| !token.is_empty())
                .map(|token| Arc::new(SignatureVerifier::new(token))),
            dispatcher,
        }
    }

    pub fn dispatcher(&self) -> &Arc<EventDispatcher> {
        &self.dispatcher
    }

    pub fn verifies_signatures(&self) -> bool {
        self.verifier.is_some()
    }
}

/// Callback body: a signal envelope, or a URL-verification challenge
#[derive(Debug, Deserialize)]
struct PushMessage {
    #[serde(default)]
    s: Option<u8>,
    #[serde(default)]
    d: Option<Value>,
    #[serde(default)]
    sn: Option<u64>,
    #[serde(default)]
    challenge: Option<String>,
}

impl PushMessage {
    /// The challenge may arrive at the top level or inside the payload
    fn challenge(&self) -> Option<&str> {
        self.challenge
            .as_deref()
            .or_else(|| self.d.as_ref()?.get("challenge")?.as_str())
            .filter(|challenge| !challenge.is_empty())
    }
}

fn required_header<'a>(headers: &'a HeaderMap, name: &'static str) -> WebhookResult<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .ok_or(WebhookError::MissingHeader(name))
}

/// Inflate the body per `Content-Encoding`
fn decode_body(headers: &HeaderMap, body: Bytes) -> WebhookResult<Vec<u8>> {
    let encoding = headers
        .get(header::CONTENT_ENCODING)
        .and_then(|value| value.to_str().ok())
        .map(str::to_ascii_lowercase);

    let mut out = Vec::new();
    match encoding.as_deref() {
        Some("deflate") => {
            ZlibDecoder::new(body.as_ref())
                .read_to_end(&mut out)
                .map_err(WebhookError::Decompression)?;
        }
        Some("gzip") => {
            GzDecoder::new(body.as_ref())
                .read_to_end(&mut out)
                .map_err(WebhookError::Decompression)?;
        }
        _ => out = body.to_vec(),
    }
    Ok(out)
}

/// POST handler for push deliveries
///
/// The signature covers the body exactly as received, so verification runs
/// before decompression.
pub async fn receive(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> WebhookResult<Json<Value>> {
    if let Some(verifier) = &state.verifier {
        let timestamp = required_header(&headers, TIMESTAMP_HEADER)?;
        let nonce = required_header(&headers, NONCE_HEADER)?;
        let signature = required_header(&headers, SIGNATURE_HEADER)?;
        verifier.verify(
            timestamp,
            nonce,
            signature,
            &body,
            chrono::Utc::now().timestamp(),
        )?;
    }

    let raw = decode_body(&headers, body)?;
    let message: PushMessage = serde_json::from_slice(&raw)?;

    if let Some(challenge) = message.challenge() {
        tracing::info!("Answering push endpoint challenge");
        return Ok(Json(json!({ "challenge": challenge })));
    }

    match message.s.and_then(SignalKind::from_u8) {
        Some(SignalKind::Event) => {
            let event: Event = serde_json::from_value(message.d.unwrap_or(Value::Null))?;
            tracing::debug!(
                sn = ?message.sn,
                event_type = %event.event_type,
                "Push event received"
            );
            state.dispatcher.dispatch(event);
        }
        other => {
            tracing::debug!(signal = ?other, "Ignoring non-event push signal");
        }
    }

    Ok(Json(json!({ "code": 0 })))
}
