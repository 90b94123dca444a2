//! Per-client token-bucket rate limiting.
//!
//! Each caller owns a bucket holding at most `burst` tokens, refilled at
//! `rate` tokens per second. A request consumes one token or is refused with
//! the time until the next token arrives.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use serde::Serialize;

/// Table size at which the first prune runs.
const PRUNE_FLOOR: usize = 10_000;

/// Callers tracked at once unless configured otherwise.
pub const DEFAULT_MAX_CLIENTS: usize = 100_000;

/// Time source for the limiter.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to.
#[cfg(test)]
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

#[cfg(test)]
impl ManualClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

#[cfg(test)]
impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug, Clone, Copy)]
struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn full(burst: f64, now: Instant) -> Self {
        Self {
            tokens: burst,
            last_refill: now,
        }
    }

    fn refill(&mut self, rate: f64, burst: f64, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * rate).min(burst);
        self.last_refill = now;
    }

    /// Time until one whole token is available.
    fn wait(&self, rate: f64) -> Duration {
        if self.tokens >= 1.0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64((1.0 - self.tokens) / rate)
        }
    }
}

/// Buckets keyed by caller plus the size that triggers the next prune.
#[derive(Debug)]
struct BucketTable {
    buckets: HashMap<String, TokenBucket>,
    prune_at: usize,
}

/// Outcome of [`RateLimiter::check`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    Allowed,
    Limited { retry_after: Duration },
}

/// Snapshot of one caller's bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketStatus {
    pub client: String,
    pub limit_per_second: f64,
    pub burst_capacity: u32,
    pub tokens_available: f64,
    pub next_token_in_ms: u64,
}

pub struct RateLimiter {
    rate: f64,
    burst: u32,
    max_clients: usize,
    clock: Arc<dyn Clock>,
    table: Mutex<BucketTable>,
}

impl RateLimiter {
    /// `rate` tokens per second, at most `burst` held. Both are clamped to 1.
    #[must_use]
    pub fn new(rate: u32, burst: u32, clock: Arc<dyn Clock>) -> Self {
        Self {
            rate: f64::from(rate.max(1)),
            burst: burst.max(1),
            max_clients: DEFAULT_MAX_CLIENTS,
            clock,
            table: Mutex::new(BucketTable {
                buckets: HashMap::new(),
                prune_at: PRUNE_FLOOR,
            }),
        }
    }

    #[must_use]
    pub fn with_system_clock(rate: u32, burst: u32) -> Self {
        Self::new(rate, burst, Arc::new(SystemClock))
    }

    /// Caps the number of tracked callers. Clamped to at least 2.
    #[must_use]
    pub fn with_max_clients(mut self, max_clients: usize) -> Self {
        self.max_clients = max_clients.max(2);
        let table = self.table.get_mut().unwrap_or_else(PoisonError::into_inner);
        table.prune_at = PRUNE_FLOOR.min(self.max_clients);
        self
    }

    /// Consumes one token from `caller`'s bucket if one is available.
    pub fn check(&self, caller: &str) -> Decision {
        let now = self.clock.now();
        let burst = f64::from(self.burst);
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);

        if table.buckets.len() >= table.prune_at && !table.buckets.contains_key(caller) {
            self.prune(&mut table, now);
        }

        let bucket = table
            .buckets
            .entry(caller.to_string())
            .or_insert_with(|| TokenBucket::full(burst, now));
        bucket.refill(self.rate, burst, now);

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            Decision::Allowed
        } else {
            Decision::Limited {
                retry_after: bucket.wait(self.rate),
            }
        }
    }

    /// Drops buckets that have refilled completely, since a fresh bucket is
    /// identical. If the table is still at capacity the least recently seen
    /// half is evicted. The next prune waits until the table doubles, so the
    /// scan cost is amortised across inserts.
    fn prune(&self, table: &mut BucketTable, now: Instant) {
        let (rate, burst) = (self.rate, f64::from(self.burst));
        let before = table.buckets.len();
        table.buckets.retain(|_, bucket| {
            let mut b = *bucket;
            b.refill(rate, burst, now);
            b.tokens < burst
        });

        if table.buckets.len() >= self.max_clients {
            let mut by_age: Vec<(Instant, String)> = table
                .buckets
                .iter()
                .map(|(caller, bucket)| (bucket.last_refill, caller.clone()))
                .collect();
            by_age.sort_unstable_by_key(|(seen, _)| *seen);
            let excess = table.buckets.len() - self.max_clients / 2;
            for (_, caller) in by_age.into_iter().take(excess) {
                table.buckets.remove(&caller);
            }
        }

        table.prune_at = (table.buckets.len() * 2)
            .clamp(PRUNE_FLOOR.min(self.max_clients), self.max_clients);
        tracing::debug!(
            before,
            after = table.buckets.len(),
            next_prune_at = table.prune_at,
            "pruned rate limit buckets"
        );
    }

    #[cfg(test)]
    fn tracked_callers(&self) -> usize {
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .buckets
            .len()
    }

    /// Current state of `caller`'s bucket without consuming a token.
    #[must_use]
    pub fn status(&self, caller: &str) -> BucketStatus {
        let now = self.clock.now();
        let burst = f64::from(self.burst);
        let table = self.table.lock().unwrap_or_else(PoisonError::into_inner);

        let mut bucket = table
            .buckets
            .get(caller)
            .copied()
            .unwrap_or_else(|| TokenBucket::full(burst, now));
        drop(table);
        bucket.refill(self.rate, burst, now);

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let next_token_in_ms = bucket.wait(self.rate).as_millis() as u64;

        BucketStatus {
            client: caller.to_string(),
            limit_per_second: self.rate,
            burst_capacity: self.burst,
            tokens_available: bucket.tokens,
            next_token_in_ms,
        }
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("rate", &self.rate)
            .field("burst", &self.burst)
            .field("max_clients", &self.max_clients)
            .finish_non_exhaustive()
    }
}
