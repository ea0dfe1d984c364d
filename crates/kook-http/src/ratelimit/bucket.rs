use governor::{DefaultDirectRateLimiter, Quota};
use std::num::NonZeroU32;
use std::time::Duration;

/// Shape of a token bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketConfig {
    /// Maximum tokens held (burst size)
    pub capacity: u32,
    /// Time to refill one token
    pub refill_interval: Duration,
}

impl BucketConfig {
    #[must_use]
    pub const fn new(capacity: u32, refill_interval: Duration) -> Self {
        Self {
            capacity,
            refill_interval,
        }
    }

    /// Bucket shared by every request: 10 tokens, one every 500ms
    #[must_use]
    pub const fn global() -> Self {
        Self::new(10, Duration::from_millis(500))
    }

    /// Bucket per resource path: 5 tokens, one every 200ms
    #[must_use]
    pub const fn per_endpoint() -> Self {
        Self::new(5, Duration::from_millis(200))
    }

    fn quota(self) -> Quota {
        let burst = NonZeroU32::new(self.capacity).unwrap_or(NonZeroU32::MIN);
        let period = self.refill_interval.max(Duration::from_nanos(1));
        Quota::with_period(period)
            .map_or_else(|| Quota::per_second(burst), |quota| quota.allow_burst(burst))
    }
}

/// A single token bucket
///
/// Starts full; refills one token per interval up to capacity whether or not
/// tokens are being consumed.
pub struct TokenBucket {
    config: BucketConfig,
    limiter: DefaultDirectRateLimiter,
}

impl TokenBucket {
    #[must_use]
    pub fn new(config: BucketConfig) -> Self {
        Self {
            config,
            limiter: DefaultDirectRateLimiter::direct(config.quota()),
        }
    }

    #[must_use]
    pub fn config(&self) -> BucketConfig {
        self.config
    }

    /// Wait until a token is available and take it
    pub async fn acquire(&self) {
        self.limiter.until_ready().await;
    }

    /// Take a token if one is available right now
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }
}

impl std::fmt::Debug for TokenBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenBucket")
            .field("capacity", &self.config.capacity)
            .field("refill_interval", &self.config.refill_interval)
            .finish()
    }
}
