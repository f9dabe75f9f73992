//! Fixed-window rate limiting
//!
//! Counters live behind the `RateLimitStore` trait so the in-memory map can be
//! replaced by a shared backend without touching the middleware or handlers.
//!
//! # Limitations
//!
//! - State is process-local; several instances behind a load balancer each
//!   enforce their own limit.
//! - Check-then-write is not atomic per key. Two concurrent requests from the
//!   same client can both observe `count < limit` and both pass.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::config::RateLimitConfig;

/// Counter for one client within the current window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRecord {
    pub count: u32,
    pub reset_time: Instant,
}

/// Storage for per-client counters
pub trait RateLimitStore: Send + Sync {
    /// Current record for `key`, if any
    fn get(&self, key: &str) -> Option<RateLimitRecord>;

    /// Adds one to an existing record and returns the updated value
    fn increment(&self, key: &str) -> Option<RateLimitRecord>;

    /// Starts a fresh window for `key` with a count of 1
    fn reset(&self, key: &str, reset_time: Instant) -> RateLimitRecord;

    /// Drops every record whose window has ended; returns how many were removed
    fn sweep(&self, now: Instant) -> usize;
}

/// Process-local store backed by a concurrent hash map
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: DashMap<String, RateLimitRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl RateLimitStore for MemoryStore {
    fn get(&self, key: &str) -> Option<RateLimitRecord> {
        self.records.get(key).map(|record| *record)
    }

    fn increment(&self, key: &str) -> Option<RateLimitRecord> {
        self.records.get_mut(key).map(|mut record| {
            record.count = record.count.saturating_add(1);
            *record
        })
    }

    fn reset(&self, key: &str, reset_time: Instant) -> RateLimitRecord {
        let record = RateLimitRecord {
            count: 1,
            reset_time,
        };
        self.records.insert(key.to_string(), record);
        record
    }

    fn sweep(&self, now: Instant) -> usize {
        let before = self.records.len();
        self.records.retain(|_, record| now <= record.reset_time);
        before.saturating_sub(self.records.len())
    }
}

/// Outcome of a rate-limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed { remaining: u32 },
    Limited { retry_after_secs: u64 },
}

/// Fixed-window limiter over an injected store
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    max_requests: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self::with_store(config, Arc::new(MemoryStore::new()))
    }

    pub fn with_store(config: RateLimitConfig, store: Arc<dyn RateLimitStore>) -> Self {
        Self {
            store,
            max_requests: config.max_requests,
            window: config.window,
        }
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Registers one request from `key` at `now`
    ///
    /// Expired records are replaced lazily here, so a record never outlives its
    /// window from the caller's point of view.
    pub fn check(&self, key: &str, now: Instant) -> RateLimitDecision {
        let current = self
            .store
            .get(key)
            .filter(|record| now <= record.reset_time);

        let record = match current {
            None => self.store.reset(key, now + self.window),
            Some(record) if record.count >= self.max_requests => {
                return RateLimitDecision::Limited {
                    retry_after_secs: retry_after(record.reset_time, now, self.window),
                };
            }
            Some(record) => self.store.increment(key).unwrap_or(RateLimitRecord {
                count: record.count + 1,
                ..record
            }),
        };

        RateLimitDecision::Allowed {
            remaining: self.max_requests.saturating_sub(record.count),
        }
    }

    pub fn sweep(&self, now: Instant) -> usize {
        self.store.sweep(now)
    }
}

/// Whole seconds until `reset_time`, rounded up, never above the window
fn retry_after(reset_time: Instant, now: Instant, window: Duration) -> u64 {
    let remaining = reset_time.saturating_duration_since(now);
    let secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
    secs.clamp(1, window.as_secs().max(1))
}
