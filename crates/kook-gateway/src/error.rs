//! Gateway error types

use kook_core::ProtocolError;
use kook_http::HttpError;
use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Gateway session error type
#[derive(Debug, Error)]
pub enum GatewayError {
    /// `connect()` used up every attempt
    #[error("Connection failed after {attempts} attempts: {last}")]
    ConnectionExhausted {
        attempts: u32,
        #[source]
        last: Box<GatewayError>,
    },

    /// The reconnect loop used up every attempt after a connection loss
    #[error("Reconnect failed after {attempts} attempts")]
    ReconnectExhausted { attempts: u32 },

    /// Gateway URL discovery failed
    #[error("Gateway discovery failed: {0}")]
    Discovery(#[from] HttpError),

    #[error("Invalid gateway URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid authorization header")]
    InvalidAuthorization,

    #[error("WebSocket error: {0}")]
    Transport(#[from] tungstenite::Error),

    #[error("Timed out during {0}")]
    Timeout(&'static str),

    /// The server's handshake carried a failure code
    #[error("Handshake rejected with code {code}: {reason}")]
    HandshakeRejected { code: i32, reason: &'static str },

    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("Frame decompression failed: {0}")]
    DecompressionFailure(#[source] std::io::Error),

    #[error(transparent)]
    Decode(#[from] ProtocolError),

    /// The stream ended before the handshake completed
    #[error("Connection closed by server")]
    ConnectionClosed,

    /// The server asked for a reconnect before the handshake completed
    #[error("Server requested reconnect during handshake")]
    ReconnectRequested,

    /// The session was closed by its owner
    #[error("Session closed")]
    Closed,
}

impl GatewayError {
    /// Whether another connection attempt may succeed
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Self::Closed | Self::InvalidUrl(_) | Self::InvalidAuthorization
        )
    }
}

/// Gateway result type
pub type GatewayResult<T> = Result<T, GatewayError>;
