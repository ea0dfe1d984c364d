//! Push endpoint errors and their HTTP mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("Missing header: {0}")]
    MissingHeader(&'static str),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// Request timestamp is older than the accepted window
    #[error("Stale timestamp: {age}s old")]
    StaleTimestamp { age: i64 },

    #[error("Signature verification failed")]
    SignatureVerificationFailed,

    #[error("Body decompression failed: {0}")]
    Decompression(#[source] std::io::Error),

    #[error("Invalid body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),
}

impl WebhookError {
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingHeader(_)
            | Self::InvalidTimestamp(_)
            | Self::StaleTimestamp { .. }
            | Self::SignatureVerificationFailed => StatusCode::UNAUTHORIZED,
            Self::Decompression(_) | Self::Decode(_) => StatusCode::BAD_REQUEST,
            Self::Bind { .. } | Self::Serve(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the request was rejected as unauthenticated
    #[must_use]
    pub fn is_verification_failure(&self) -> bool {
        self.status_code() == StatusCode::UNAUTHORIZED
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if self.is_verification_failure() {
            tracing::warn!(error = %self, "Rejected push request");
        } else {
            tracing::error!(error = %self, "Push request failed");
        }

        let body = json!({
            "code": status.as_u16(),
            "message": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

pub type WebhookResult<T> = Result<T, WebhookError>;
