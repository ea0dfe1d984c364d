//! Token-bucket admission control
//!
//! One global bucket shared by every request plus one bucket per resource
//! path, created on first use and kept for the life of the limiter.

mod bucket;
mod limiter;

pub use bucket::{BucketConfig, TokenBucket};
pub use limiter::RateLimiter;
