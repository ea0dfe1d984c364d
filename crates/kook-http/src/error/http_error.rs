use super::ErrorCode;
use std::error::Error as _;
use std::fmt;
use std::io;
use std::time::Duration;
use thiserror::Error;

/// A failure reported by the platform, either through the response envelope
/// or through the HTTP status alone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// Envelope `code`, or the HTTP status when the body was not an envelope
    pub code: i32,
    pub message: String,
    pub http_status: u16,
    pub request_id: Option<String>,
    /// Server-provided wait before retrying
    pub retry_after: Option<Duration>,
    pub method: String,
    pub endpoint: String,
}

impl ApiError {
    #[must_use]
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            http_status: 0,
            request_id: None,
            retry_after: None,
            method: String::new(),
            endpoint: String::new(),
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.http_status = status;
        self
    }

    #[must_use]
    pub fn with_context(mut self, method: impl Into<String>, endpoint: impl Into<String>) -> Self {
        self.method = method.into();
        self.endpoint = endpoint.into();
        self
    }

    #[must_use]
    pub fn with_request_id(mut self, request_id: Option<String>) -> Self {
        self.request_id = request_id;
        self
    }

    #[must_use]
    pub fn with_retry_after(mut self, retry_after: Option<Duration>) -> Self {
        self.retry_after = retry_after;
        self
    }

    #[must_use]
    pub fn error_code(&self) -> Option<ErrorCode> {
        ErrorCode::from_i32(self.code)
    }

    /// Remote 5xx, either as envelope code or HTTP status
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.code) || self.code >= 50000 || self.http_status >= 500
    }

    /// Rejected as the caller's fault (4xx status or a 4xxxx platform code)
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        !self.is_server_error()
            && ((40000..50000).contains(&self.code) || (400..500).contains(&self.http_status))
    }

    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        self.code == 429
            || self.code == ErrorCode::TooManyRequests.as_i32()
            || self.http_status == 429
    }

    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.is_server_error() || self.is_rate_limited() || self.http_status == 408
    }

    #[must_use]
    pub fn is_auth_error(&self) -> bool {
        self.code == ErrorCode::Unauthorized.as_i32() || self.http_status == 401
    }

    #[must_use]
    pub fn is_permission_error(&self) -> bool {
        self.code == ErrorCode::Forbidden.as_i32() || self.http_status == 403
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.code == ErrorCode::NotFound.as_i32() || self.http_status == 404
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = if !self.message.is_empty() {
            self.message.as_str()
        } else if let Some(code) = self.error_code() {
            code.description()
        } else {
            "unknown error"
        };
        write!(f, "API error [{}]: {message}", self.code)?;
        if !self.endpoint.is_empty() {
            write!(f, " ({} {})", self.method, self.endpoint)?;
        }
        Ok(())
    }
}

impl std::error::Error for ApiError {}

/// Request transport error type
#[derive(Debug, Error)]
pub enum HttpError {
    /// The platform rejected the request
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Connection reset: {0}")]
    ConnectionReset(String),

    #[error("Connection refused: {0}")]
    ConnectionRefused(String),

    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Invalid {field}: {message}")]
    Validation { field: &'static str, message: String },

    /// Only produced by non-blocking admission
    #[error("Rate limit rejected for {key}")]
    RateLimitRejected { key: String },

    #[error("Retry failed after {attempts} attempts: {source}")]
    RetryExhausted {
        attempts: u32,
        #[source]
        source: Box<HttpError>,
    },
}

impl HttpError {
    /// Classify a transport failure from the HTTP client
    pub fn from_transport(err: reqwest::Error) -> Self {
        let target = err
            .url()
            .map_or_else(|| "request".to_string(), ToString::to_string);

        let mut source = err.source();
        while let Some(cause) = source {
            if let Some(io) = cause.downcast_ref::<io::Error>() {
                match io.kind() {
                    io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted => {
                        return Self::ConnectionReset(target);
                    }
                    io::ErrorKind::ConnectionRefused => return Self::ConnectionRefused(target),
                    io::ErrorKind::TimedOut => return Self::Timeout(target),
                    _ => {}
                }
            }
            source = cause.source();
        }

        if err.is_timeout() {
            Self::Timeout(target)
        } else {
            Self::Network(err)
        }
    }

    /// Whether repeating the request may succeed
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Api(e) => e.is_retryable(),
            Self::Timeout(_) | Self::ConnectionReset(_) | Self::ConnectionRefused(_) => true,
            Self::Network(_)
            | Self::Decode(_)
            | Self::Validation { .. }
            | Self::RateLimitRejected { .. }
            | Self::RetryExhausted { .. } => false,
        }
    }

    /// Whether the platform rejected the request for exceeding its rate limit
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        match self {
            Self::Api(e) => e.is_rate_limited(),
            Self::RetryExhausted { source, .. } => source.is_rate_limited(),
            _ => false,
        }
    }

    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.api_error().is_some_and(ApiError::is_server_error)
    }

    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.api_error().is_some_and(ApiError::is_client_error)
    }

    /// The platform error behind this failure, looking through retry exhaustion
    #[must_use]
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Api(e) => Some(e),
            Self::RetryExhausted { source, .. } => source.api_error(),
            _ => None,
        }
    }
}

/// Request transport result type
pub type HttpResult<T> = Result<T, HttpError>;
