//! Sliding-window rate limiting for authentication endpoints.
//!
//! Each key (client IP plus username or operation) keeps the timestamps of
//! its accepted attempts. On every check the timestamps older than the
//! window are purged first; a key already at the limit is denied without
//! recording the denied call.
//!
//! The window lives behind [`RateLimitStore`] so a shared backing store can
//! replace the per-process map without touching the algorithm.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use tracing::debug;

use crate::clock::Clock;

/// Attempts allowed per window.
pub const DEFAULT_MAX_ATTEMPTS: usize = 5;

/// Trailing window: 60 seconds.
pub const DEFAULT_WINDOW_SECS: i64 = 60;

/// Interval between background purges.
const CLEANUP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(60);

/// Attempt timestamps for one key, oldest first.
pub type AttemptWindow = VecDeque<DateTime<Utc>>;

/// Storage for per-key attempt windows.
///
/// `with_window` must run `f` atomically with respect to other calls for
/// the same key.
pub trait RateLimitStore: Send + Sync + 'static {
    /// Run `f` against the window for `key`, creating it if missing.
    fn with_window<R>(&self, key: &str, f: impl FnOnce(&mut AttemptWindow) -> R) -> R;

    /// Read the window for `key` without creating it.
    fn peek<R>(&self, key: &str, f: impl FnOnce(Option<&AttemptWindow>) -> R) -> R;

    /// Drop all attempts for `key`.
    fn remove(&self, key: &str);

    /// Keep only the windows for which `keep` returns true.
    fn retain(&self, keep: impl FnMut(&mut AttemptWindow) -> bool);
}

/// Per-process, non-durable store.
#[derive(Debug, Default)]
pub struct InMemoryRateLimitStore {
    windows: DashMap<String, AttemptWindow>,
}

impl InMemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently tracked.
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

impl RateLimitStore for InMemoryRateLimitStore {
    fn with_window<R>(&self, key: &str, f: impl FnOnce(&mut AttemptWindow) -> R) -> R {
        let mut entry = self.windows.entry(key.to_string()).or_default();
        f(entry.value_mut())
    }

    fn peek<R>(&self, key: &str, f: impl FnOnce(Option<&AttemptWindow>) -> R) -> R {
        match self.windows.get(key) {
            Some(window) => f(Some(window.value())),
            None => f(None),
        }
    }

    fn remove(&self, key: &str) {
        self.windows.remove(key);
    }

    fn retain(&self, mut keep: impl FnMut(&mut AttemptWindow) -> bool) {
        self.windows.retain(|_, window| keep(window));
    }
}

/// Sliding-window limiter.
#[derive(Debug)]
pub struct RateLimiter<S: RateLimitStore = InMemoryRateLimitStore> {
    store: S,
    max_attempts: usize,
    window: Duration,
    clock: Arc<dyn Clock>,
}

impl RateLimiter<InMemoryRateLimitStore> {
    /// In-memory limiter with the default 5 attempts per 60 seconds.
    pub fn in_memory(clock: Arc<dyn Clock>) -> Self {
        Self::new(
            InMemoryRateLimitStore::new(),
            DEFAULT_MAX_ATTEMPTS,
            Duration::seconds(DEFAULT_WINDOW_SECS),
            clock,
        )
    }
}

impl<S: RateLimitStore> RateLimiter<S> {
    pub fn new(store: S, max_attempts: usize, window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            max_attempts,
            window,
            clock,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.window
    }

    /// Record an attempt for `key` if it is under the limit.
    ///
    /// Returns `false` (and records nothing) when the limit is reached.
    pub fn check_limit(&self, key: &str) -> bool {
        let now = self.clock.now();
        let cutoff = self.cutoff(now);
        let allowed = self.store.with_window(key, |window| {
            purge(window, cutoff);
            if window.len() >= self.max_attempts {
                return false;
            }
            window.push_back(now);
            true
        });
        if !allowed {
            debug!(key, "rate limit exceeded");
        }
        allowed
    }

    /// Attempts left in the current window.
    pub fn remaining_attempts(&self, key: &str) -> usize {
        let cutoff = self.cutoff(self.clock.now());
        let used = self
            .store
            .peek(key, |window| window.map_or(0, |w| live(w, cutoff).count()));
        self.max_attempts.saturating_sub(used)
    }

    /// Time until the oldest live attempt leaves the window, or `None` if
    /// there are no live attempts.
    pub fn time_until_reset(&self, key: &str) -> Option<std::time::Duration> {
        let now = self.clock.now();
        let cutoff = self.cutoff(now);
        let oldest = self
            .store
            .peek(key, |window| window.and_then(|w| live(w, cutoff).next().copied()))?;
        (oldest + self.window - now).to_std().ok()
    }

    /// Forget every attempt for `key`.
    pub fn reset(&self, key: &str) {
        self.store.remove(key);
    }

    /// Purge expired attempts everywhere and drop empty windows.
    pub fn cleanup(&self) {
        let cutoff = self.cutoff(self.clock.now());
        self.store.retain(|window| {
            purge(window, cutoff);
            !window.is_empty()
        });
    }
}

impl<S: RateLimitStore> RateLimiter<S> {
    /// Spawn a periodic cleanup task on the current tokio runtime.
    pub fn spawn_cleanup_task(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
            loop {
                interval.tick().await;
                limiter.cleanup();
            }
        })
    }
}

/// Remove attempts at or before `cutoff`. Windows are kept sorted.
fn purge(window: &mut AttemptWindow, cutoff: DateTime<Utc>) {
    while window.front().is_some_and(|t| *t <= cutoff) {
        window.pop_front();
    }
}

fn live(window: &AttemptWindow, cutoff: DateTime<Utc>) -> impl Iterator<Item = &DateTime<Utc>> {
    window.iter().filter(move |t| **t > cutoff)
}

/// Build a limiter key from its parts, e.g. `login:10.0.0.1:alice`.
pub fn rate_limit_key(scope: &str, parts: &[&str]) -> String {
    let mut key = scope.to_string();
    for part in parts {
        key.push(':');
        key.push_str(part);
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn limiter() -> (RateLimiter, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::starting_now());
        (RateLimiter::in_memory(clock.clone()), clock)
    }

    #[test]
    fn allows_max_attempts_then_denies() {
        let (limiter, clock) = limiter();
        for _ in 0..DEFAULT_MAX_ATTEMPTS {
            assert!(limiter.check_limit("k"));
            clock.advance(Duration::seconds(1));
        }
        assert!(!limiter.check_limit("k"));
        clock.advance(Duration::seconds(DEFAULT_WINDOW_SECS));
        assert!(limiter.check_limit("k"));
    }

    #[test]
    fn sixth_call_in_same_instant_is_denied_until_window_passes() {
        let (limiter, clock) = limiter();
        for _ in 0..DEFAULT_MAX_ATTEMPTS {
            assert!(limiter.check_limit("k"));
        }
        assert!(!limiter.check_limit("k"));
        clock.advance(Duration::seconds(DEFAULT_WINDOW_SECS));
        assert!(limiter.check_limit("k"));
    }

    #[test]
    fn denied_checks_are_not_recorded() {
        let (limiter, _) = limiter();
        for _ in 0..DEFAULT_MAX_ATTEMPTS {
            limiter.check_limit("k");
        }
        for _ in 0..20 {
            assert!(!limiter.check_limit("k"));
        }
        limiter
            .store()
            .peek("k", |w| assert_eq!(w.map(|w| w.len()), Some(DEFAULT_MAX_ATTEMPTS)));
    }

    #[test]
    fn keys_are_independent() {
        let (limiter, _) = limiter();
        for _ in 0..DEFAULT_MAX_ATTEMPTS {
            limiter.check_limit("a");
        }
        assert!(!limiter.check_limit("a"));
        assert!(limiter.check_limit("b"));
    }

    #[test]
    fn remaining_attempts_counts_down() {
        let (limiter, _) = limiter();
        assert_eq!(limiter.remaining_attempts("k"), DEFAULT_MAX_ATTEMPTS);
        limiter.check_limit("k");
        limiter.check_limit("k");
        assert_eq!(limiter.remaining_attempts("k"), DEFAULT_MAX_ATTEMPTS - 2);
    }

    #[test]
    fn time_until_reset_tracks_oldest_attempt() {
        let (limiter, clock) = limiter();
        assert_eq!(limiter.time_until_reset("k"), None);
        limiter.check_limit("k");
        clock.advance(Duration::seconds(20));
        limiter.check_limit("k");
        assert_eq!(
            limiter.time_until_reset("k"),
            Some(std::time::Duration::from_secs(40))
        );
        clock.advance(Duration::seconds(40));
        assert_eq!(
            limiter.time_until_reset("k"),
            Some(std::time::Duration::from_secs(20))
        );
    }

    #[test]
    fn reset_clears_key() {
        let (limiter, _) = limiter();
        for _ in 0..DEFAULT_MAX_ATTEMPTS {
            limiter.check_limit("k");
        }
        limiter.reset("k");
        assert_eq!(limiter.remaining_attempts("k"), DEFAULT_MAX_ATTEMPTS);
        assert!(limiter.check_limit("k"));
    }

    #[test]
    fn cleanup_drops_expired_windows() {
        let (limiter, clock) = limiter();
        limiter.check_limit("old");
        clock.advance(Duration::seconds(DEFAULT_WINDOW_SECS + 1));
        limiter.check_limit("fresh");
        limiter.cleanup();
        assert_eq!(limiter.store().len(), 1);
        limiter.store().peek("old", |w| assert!(w.is_none()));
    }

    #[test]
    fn concurrent_checks_never_exceed_limit() {
        let (limiter, _) = limiter();
        let limiter = Arc::new(limiter);
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let limiter = limiter.clone();
                std::thread::spawn(move || limiter.check_limit("shared"))
            })
            .collect();
        let allowed = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(allowed, DEFAULT_MAX_ATTEMPTS);
    }

    #[test]
    fn key_builder_joins_parts() {
        assert_eq!(
            rate_limit_key("login", &["10.0.0.1", "alice"]),
            "login:10.0.0.1:alice"
        );
    }

    #[tokio::test]
    async fn cleanup_task_can_be_spawned_and_aborted() {
        let (limiter, _) = limiter();
        let handle = Arc::new(limiter).spawn_cleanup_task();
        handle.abort();
        assert!(handle.await.unwrap_err().is_cancelled());
    }
}
