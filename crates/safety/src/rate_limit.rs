//! Sliding-window admission control over outbound generation requests.
//!
//! Tracks admitted request timestamps per bucket. With
//! [`RateLimitScope::Global`] every caller shares one bucket; with
//! [`RateLimitScope::PerSession`] each session key gets its own.
//! Thread-safe via `std::sync::Mutex` (non-async, held only for the check).

use bravomind_config::{RateLimitConfig, RateLimitScope};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

const GLOBAL_KEY: &str = "global";

/// Buckets beyond this count trigger eviction of idle ones.
const MAX_BUCKETS: usize = 10_000;

#[derive(Debug)]
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    scope: RateLimitScope,
    buckets: Mutex<HashMap<String, Vec<Instant>>>,
}

impl RateLimiter {
    /// A single shared bucket admitting `max_requests` per `window`.
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self::with_scope(max_requests, window, RateLimitScope::Global)
    }

    pub fn with_scope(max_requests: usize, window: Duration, scope: RateLimitScope) -> Self {
        Self {
            max_requests,
            window,
            scope,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::with_scope(config.max_requests, config.window(), config.scope)
    }

    pub fn scope(&self) -> RateLimitScope {
        self.scope
    }

    /// Try to admit one request into the shared bucket at `now`.
    pub fn try_acquire(&self, now: Instant) -> bool {
        self.try_acquire_for(GLOBAL_KEY, now)
    }

    /// Try to admit one request for `session` at `now`.
    ///
    /// Entries older than the window are purged first. When the bucket is
    /// full the request is denied and nothing else changes.
    pub fn try_acquire_for(&self, session: &str, now: Instant) -> bool {
        let key = self.bucket_key(session);
        let mut buckets = self.buckets.lock().unwrap_or_else(|e| e.into_inner());

        if buckets.len() > MAX_BUCKETS {
            buckets.retain(|_, timestamps| {
                timestamps
                    .iter()
                    .any(|t| now.saturating_duration_since(*t) < self.window)
            });
        }

        let timestamps = buckets.entry(key.to_string()).or_default();
        timestamps.retain(|t| now.saturating_duration_since(*t) < self.window);

        if timestamps.len() >= self.max_requests {
            debug!(bucket = %key, in_window = timestamps.len(), "Admission denied");
            return false;
        }

        timestamps.push(now);
        true
    }

    /// Requests admitted for `session` that are still inside the window at `now`.
    pub fn in_window(&self, session: &str, now: Instant) -> usize {
        let key = self.bucket_key(session);
        let buckets = self.buckets.lock().unwrap_or_else(|e| e.into_inner());
        buckets.get(key).map_or(0, |timestamps| {
            timestamps
                .iter()
                .filter(|t| now.saturating_duration_since(**t) < self.window)
                .count()
        })
    }

    /// How long until `session` can be admitted again, if it is currently full.
    pub fn retry_after(&self, session: &str, now: Instant) -> Option<Duration> {
        let key = self.bucket_key(session);
        let buckets = self.buckets.lock().unwrap_or_else(|e| e.into_inner());
        let timestamps = buckets.get(key)?;
        let live: Vec<&Instant> = timestamps
            .iter()
            .filter(|t| now.saturating_duration_since(**t) < self.window)
            .collect();
        if live.len() < self.max_requests {
            return None;
        }
        let oldest = live.into_iter().min()?;
        Some(self.window.saturating_sub(now.saturating_duration_since(*oldest)))
    }

    fn bucket_key<'a>(&self, session: &'a str) -> &'a str {
        match self.scope {
            RateLimitScope::Global => GLOBAL_KEY,
            RateLimitScope::PerSession => session,
        }
    }
}
