//! Fixed-window rate limiting.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

/// Rate limiter trait for counting hits per key.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Count a hit against `key` within a fixed window. The first hit of a
    /// window fixes its end at `now + window`; a hit at or past the end
    /// starts a fresh window. Denied hits are not counted. `now` is passed
    /// in so callers and tests control the clock.
    async fn check(
        &self,
        key: &str,
        limit: u32,
        window: Duration,
        now: DateTime<Utc>,
    ) -> Result<RateLimitDecision>;
}

/// Result of a rate limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitDecision {
    /// Under the limit; the hit was counted.
    Allowed {
        remaining: u32,
        reset_at: DateTime<Utc>,
    },
    /// Over the limit; the hit was not counted.
    Exceeded { reset_at: DateTime<Utc> },
}

impl RateLimitDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitDecision::Allowed { .. })
    }

    /// Seconds until the window resets, rounded up and never below one.
    /// This is the value for the Retry-After header.
    pub fn retry_after_secs(&self, now: DateTime<Utc>) -> u64 {
        let reset_at = match self {
            RateLimitDecision::Allowed { reset_at, .. } => *reset_at,
            RateLimitDecision::Exceeded { reset_at } => *reset_at,
        };
        let millis = (reset_at - now).num_milliseconds().max(0) as u64;
        millis.div_ceil(1000).max(1)
    }
}

#[derive(Debug, Clone)]
struct Bucket {
    count: u32,
    reset_at: DateTime<Utc>,
}

/// In-memory implementation of RateLimiter.
pub struct MemoryRateLimiter {
    buckets: Mutex<HashMap<String, Bucket>>,
}

impl MemoryRateLimiter {
    pub fn new() -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Bucket>>> {
        self.buckets
            .lock()
            .map_err(|_| anyhow::anyhow!("rate limiter lock poisoned"))
    }
}

impl Default for MemoryRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RateLimiter for MemoryRateLimiter {
    async fn check(
        &self,
        key: &str,
        limit: u32,
        window: Duration,
        now: DateTime<Utc>,
    ) -> Result<RateLimitDecision> {
        let mut buckets = self.lock()?;

        match buckets.get_mut(key) {
            Some(bucket) if now < bucket.reset_at => {
                if bucket.count >= limit {
                    return Ok(RateLimitDecision::Exceeded {
                        reset_at: bucket.reset_at,
                    });
                }
                bucket.count += 1;
                Ok(RateLimitDecision::Allowed {
                    remaining: limit.saturating_sub(bucket.count),
                    reset_at: bucket.reset_at,
                })
            }
            _ => {
                let reset_at = now + window;
                buckets.insert(
                    key.to_string(),
                    Bucket {
                        count: 1,
                        reset_at,
                    },
                );
                Ok(RateLimitDecision::Allowed {
                    remaining: limit.saturating_sub(1),
                    reset_at,
                })
            }
        }
    }
}
