//! Platform error codes
//!
//! The `code` field of the response envelope mirrors HTTP status with two
//! extra digits (e.g. `40300` for forbidden).

/// Known platform error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ErrorCode {
    Ok = 0,
    BadRequest = 40000,
    Unauthorized = 40100,
    Forbidden = 40300,
    NotFound = 40400,
    MethodNotAllowed = 40500,
    TooManyRequests = 42900,
    InternalServerError = 50000,
    BadGateway = 50200,
    ServiceUnavailable = 50300,
    GatewayTimeout = 50400,
}

impl ErrorCode {
    #[must_use]
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(Self::Ok),
            40000 => Some(Self::BadRequest),
            40100 => Some(Self::Unauthorized),
            40300 => Some(Self::Forbidden),
            40400 => Some(Self::NotFound),
            40500 => Some(Self::MethodNotAllowed),
            42900 => Some(Self::TooManyRequests),
            50000 => Some(Self::InternalServerError),
            50200 => Some(Self::BadGateway),
            50300 => Some(Self::ServiceUnavailable),
            50400 => Some(Self::GatewayTimeout),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self as i32
    }

    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Ok => "request succeeded",
            Self::BadRequest => "invalid request parameters",
            Self::Unauthorized => "authentication failed, invalid token",
            Self::Forbidden => "insufficient permissions",
            Self::NotFound => "resource does not exist",
            Self::MethodNotAllowed => "method not allowed",
            Self::TooManyRequests => "too many requests",
            Self::InternalServerError => "internal server error",
            Self::BadGateway => "bad gateway",
            Self::ServiceUnavailable => "service unavailable",
            Self::GatewayTimeout => "gateway timeout",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.description(), self.as_i32())
    }
}
