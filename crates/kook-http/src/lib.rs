//! # kook-http
//!
//! Request transport for the platform API. Every call passes through a
//! two-level token-bucket [`RateLimiter`] and a [`RetryExecutor`] with
//! exponential backoff.

pub mod client;
pub mod error;
pub mod ratelimit;
pub mod retry;

pub use client::{ApiEnvelope, GatewayIndex, HttpClient, HttpClientBuilder};
pub use error::{ApiError, ErrorCode, HttpError, HttpResult};
pub use ratelimit::{BucketConfig, RateLimiter, TokenBucket};
pub use retry::{RetryExecutor, RetryPolicy};
