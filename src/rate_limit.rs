//! In-memory request rate limiting.
//!
//! DESIGN
//! ======
//! Sliding-window counters backed by `HashMap<Uuid, VecDeque<Instant>>`.
//! Two limits enforced on authenticated requests:
//! - Per-user: 120 requests/min
//! - Global: 2000 requests/min
//!
//! The limiter lives in `AppState` and is consulted by the `AuthUser`
//! extractor, so every authenticated endpoint is covered without per-route
//! annotations.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use uuid::Uuid;

const DEFAULT_PER_USER_LIMIT: usize = 120;
const DEFAULT_PER_USER_WINDOW_SECS: u64 = 60;

const DEFAULT_GLOBAL_LIMIT: usize = 2000;
const DEFAULT_GLOBAL_WINDOW_SECS: u64 = 60;

#[derive(Clone, Copy)]
struct RateLimitConfig {
    per_user_limit: usize,
    per_user_window: Duration,
    global_limit: usize,
    global_window: Duration,
}

impl RateLimitConfig {
    fn from_env() -> Self {
        let per_user_window_secs = env_parse("RATE_LIMIT_PER_USER_WINDOW_SECS", DEFAULT_PER_USER_WINDOW_SECS);
        let global_window_secs = env_parse("RATE_LIMIT_GLOBAL_WINDOW_SECS", DEFAULT_GLOBAL_WINDOW_SECS);

        Self {
            per_user_limit: env_parse("RATE_LIMIT_PER_USER", DEFAULT_PER_USER_LIMIT),
            per_user_window: Duration::from_secs(per_user_window_secs),
            global_limit: env_parse("RATE_LIMIT_GLOBAL", DEFAULT_GLOBAL_LIMIT),
            global_window: Duration::from_secs(global_window_secs),
        }
    }
}

fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

// =============================================================================
// ERROR TYPE
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    #[error("per-user rate limit exceeded (max {limit} requests/{window_secs}s)")]
    PerUserExceeded { limit: usize, window_secs: u64 },
    #[error("global rate limit exceeded (max {limit} requests/{window_secs}s)")]
    GlobalExceeded { limit: usize, window_secs: u64 },
}

// =============================================================================
// RATE LIMITER
// =============================================================================

#[derive(Clone)]
pub struct RateLimiter {
    inner: std::sync::Arc<Mutex<RateLimiterInner>>,
    config: RateLimitConfig,
}

struct RateLimiterInner {
    /// Per-user request timestamps.
    user_requests: HashMap<Uuid, VecDeque<Instant>>,
    /// Global request timestamps.
    global_requests: VecDeque<Instant>,
    /// Last time idle `user_requests` entries were swept out.
    last_sweep: Instant,
}

impl RateLimiter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: std::sync::Arc::new(Mutex::new(RateLimiterInner {
                user_requests: HashMap::new(),
                global_requests: VecDeque::new(),
                last_sweep: Instant::now(),
            })),
            config: RateLimitConfig::from_env(),
        }
    }

    /// Check both per-user and global rate limits, then record the request.
    ///
    /// # Errors
    ///
    /// Returns a `RateLimitError` variant naming the exceeded window.
    pub fn check_and_record(&self, user_id: Uuid) -> Result<(), RateLimitError> {
        self.check_and_record_at(user_id, Instant::now())
    }

    /// Internal: check + record with explicit timestamp (for testing).
    fn check_and_record_at(&self, user_id: Uuid, now: Instant) -> Result<(), RateLimitError> {
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let cfg = self.config;

        // At most once per window, drop users whose entries all aged out so
        // the map does not grow with every distinct user id ever seen.
        if now.duration_since(inner.last_sweep) >= cfg.per_user_window {
            inner.last_sweep = now;
            let window = cfg.per_user_window;
            inner.user_requests.retain(|_, deque| {
                prune_window(deque, now, window);
                !deque.is_empty()
            });
        }

        // Prune and check global first (no borrow conflict).
        prune_window(&mut inner.global_requests, now, cfg.global_window);
        if inner.global_requests.len() >= cfg.global_limit {
            return Err(RateLimitError::GlobalExceeded {
                limit: cfg.global_limit,
                window_secs: cfg.global_window.as_secs(),
            });
        }

        // Prune and check per-user.
        let user_deque = inner.user_requests.entry(user_id).or_default();
        prune_window(user_deque, now, cfg.per_user_window);
        if user_deque.len() >= cfg.per_user_limit {
            return Err(RateLimitError::PerUserExceeded {
                limit: cfg.per_user_limit,
                window_secs: cfg.per_user_window.as_secs(),
            });
        }

        // Record.
        user_deque.push_back(now);
        inner.global_requests.push_back(now);

        Ok(())
    }

    #[cfg(test)]
    fn tracked_user_count(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .user_requests
            .len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn prune_window(deque: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(&front) = deque.front() {
        if now.duration_since(front) > window {
            deque.pop_front();
        } else {
            break;
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[path = "rate_limit_test.rs"]
mod tests;
