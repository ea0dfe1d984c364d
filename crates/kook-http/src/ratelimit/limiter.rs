use super::{BucketConfig, TokenBucket};
use crate::error::{HttpError, HttpResult};
use dashmap::DashMap;
use std::sync::Arc;

/// Two-level rate limiter: global bucket first, then the per-key bucket
///
/// A global token taken before the key's bucket turns out empty is not
/// returned, so callers may wait longer than strictly necessary but never less.
#[derive(Debug)]
pub struct RateLimiter {
    global: TokenBucket,
    endpoint_config: BucketConfig,
    buckets: DashMap<String, Arc<TokenBucket>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(BucketConfig::global(), BucketConfig::per_endpoint())
    }
}

impl RateLimiter {
    #[must_use]
    pub fn new(global: BucketConfig, per_endpoint: BucketConfig) -> Self {
        Self {
            global: TokenBucket::new(global),
            endpoint_config: per_endpoint,
            buckets: DashMap::new(),
        }
    }

    /// Bucket for a key, created on first use
    fn bucket(&self, key: &str) -> Arc<TokenBucket> {
        if let Some(bucket) = self.buckets.get(key) {
            return Arc::clone(bucket.value());
        }

        // Another caller may have inserted between the lookup and here
        let bucket = self
            .buckets
            .entry(key.to_string())
            .or_insert_with(|| {
                tracing::debug!(key = %key, "Creating rate limit bucket");
                Arc::new(TokenBucket::new(self.endpoint_config))
            });
        Arc::clone(bucket.value())
    }

    /// Wait for one global token and one token for `key`
    pub async fn acquire(&self, key: &str) {
        self.global.acquire().await;
        self.bucket(key).acquire().await;
    }

    /// Take one global and one `key` token without waiting
    ///
    /// Returns `false` if either bucket is empty.
    pub fn try_acquire(&self, key: &str) -> bool {
        if !self.global.try_acquire() {
            return false;
        }
        self.bucket(key).try_acquire()
    }

    /// [`try_acquire`](Self::try_acquire) reported as an error
    pub fn check(&self, key: &str) -> HttpResult<()> {
        if self.try_acquire(key) {
            Ok(())
        } else {
            Err(HttpError::RateLimitRejected {
                key: key.to_string(),
            })
        }
    }

    /// Number of per-key buckets created so far
    #[must_use]
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }
}
