//! Gateway frame format
//!
//! The signal kind is kept as its raw integer so frames with a kind this
//! client does not know still decode and can be logged by the reader.

use super::{HelloPayload, PingPayload, ResumePayload, SignalKind};
use crate::events::Event;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Errors produced while decoding frames or their payloads
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Malformed frame: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("{0} frame carries no payload")]
    MissingPayload(SignalKind),

    #[error("Expected {expected} frame, got s={actual}")]
    UnexpectedKind { expected: SignalKind, actual: u8 },
}

/// One envelope on the gateway stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayFrame {
    /// Raw signal kind
    pub s: u8,

    /// Signal payload
    #[serde(default)]
    pub d: Option<Value>,

    /// Sequence number (event frames only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sn: Option<u64>,
}

impl GatewayFrame {
    fn new(kind: SignalKind, d: Option<Value>) -> Self {
        Self {
            s: kind.as_u8(),
            d,
            sn: None,
        }
    }

    fn with_payload<T: Serialize>(kind: SignalKind, payload: &T) -> Self {
        Self::new(kind, serde_json::to_value(payload).ok())
    }

    // === Client frames ===

    /// Heartbeat request carrying the last processed sequence
    #[must_use]
    pub fn ping(sn: u64) -> Self {
        Self::with_payload(SignalKind::Ping, &PingPayload { sn })
    }

    /// Heartbeat response echoing the server's tag
    #[must_use]
    pub fn pong(sn: u64) -> Self {
        Self::with_payload(SignalKind::Pong, &PingPayload { sn })
    }

    #[must_use]
    pub fn resume(session_id: impl Into<String>, sn: u64) -> Self {
        Self::with_payload(
            SignalKind::Resume,
            &ResumePayload {
                session_id: session_id.into(),
                sn,
            },
        )
    }

    // === Server frames ===

    #[must_use]
    pub fn event(sn: u64, data: Value) -> Self {
        Self {
            s: SignalKind::Event.as_u8(),
            d: Some(data),
            sn: Some(sn),
        }
    }

    #[must_use]
    pub fn hello(payload: &HelloPayload) -> Self {
        Self::with_payload(SignalKind::Hello, payload)
    }

    #[must_use]
    pub fn reconnect() -> Self {
        Self::new(SignalKind::Reconnect, None)
    }

    #[must_use]
    pub fn resume_ack(session_id: impl Into<String>) -> Self {
        Self::new(
            SignalKind::ResumeAck,
            Some(serde_json::json!({ "session_id": session_id.into() })),
        )
    }

    // === Parsing ===

    /// The decoded signal kind, `None` for kinds this client does not know
    #[must_use]
    pub fn kind(&self) -> Option<SignalKind> {
        SignalKind::from_u8(self.s)
    }

    fn payload_as<T: DeserializeOwned>(&self, expected: SignalKind) -> Result<T, ProtocolError> {
        if self.s != expected.as_u8() {
            return Err(ProtocolError::UnexpectedKind {
                expected,
                actual: self.s,
            });
        }
        let d = self
            .d
            .as_ref()
            .ok_or(ProtocolError::MissingPayload(expected))?;
        Ok(T::deserialize(d)?)
    }

    pub fn as_hello(&self) -> Result<HelloPayload, ProtocolError> {
        self.payload_as(SignalKind::Hello)
    }

    pub fn as_event(&self) -> Result<Event, ProtocolError> {
        self.payload_as(SignalKind::Event)
    }

    pub fn as_resume(&self) -> Result<ResumePayload, ProtocolError> {
        self.payload_as(SignalKind::Resume)
    }

    /// Heartbeat tag of a ping or pong; an absent payload reads as zero
    #[must_use]
    pub fn heartbeat_sn(&self) -> u64 {
        self.d
            .as_ref()
            .and_then(|d| PingPayload::deserialize(d).ok())
            .map_or(0, |p| p.sn)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

impl std::fmt::Display for GatewayFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind() {
            Some(kind) => write!(f, "GatewayFrame(s={kind}")?,
            None => write!(f, "GatewayFrame(s=unknown {}", self.s)?,
        }
        if let Some(sn) = self.sn {
            write!(f, ", sn={sn}")?;
        }
        write!(f, ")")
    }
}
