//! Sliding-window rate limiter
//!
//! In-memory, per-client sliding window. Each client identifier owns an
//! ordered list of `(timestamp, count)` entries; entries older than the
//! window are purged lazily on every check, so the live window length is
//! bounded by the configured capacity.
//!
//! Client keys are never evicted once created, so the map grows with the
//! number of distinct identifiers seen over the process lifetime. That is a
//! known scaling constraint of the single-process design, not an accident.

use dashmap::DashMap;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Reserved bucket for requests with no usable client identifier. These must
/// still be rate-limited rather than bypass the limiter.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Outcome of an admission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    /// Whether the request may proceed
    pub allowed: bool,
    /// Requests left in the current window after this one
    pub remaining: u32,
}

/// In-memory rate limiter with a sliding window
pub struct SlidingWindowLimiter {
    /// Maximum admitted requests per window, per client. 0 disables the limiter.
    requests_per_minute: u32,
    /// Window size (one minute unless overridden for tests)
    window: Duration,
    /// Map of client identifier -> (timestamp, count) entries
    windows: DashMap<String, Vec<(Instant, u32)>>,
}

impl SlidingWindowLimiter {
    /// Create a limiter with the default one-minute window
    pub fn new(requests_per_minute: u32) -> Self {
        info!(
            "Rate limiter initialized: {} requests/minute",
            requests_per_minute
        );
        Self::with_window(requests_per_minute, Duration::from_secs(60))
    }

    /// Create a limiter with an explicit window size
    pub fn with_window(requests_per_minute: u32, window: Duration) -> Self {
        Self {
            requests_per_minute,
            window,
            windows: DashMap::new(),
        }
    }

    /// Whether the limiter is active. A configured limit of 0 disables it.
    pub fn enabled(&self) -> bool {
        self.requests_per_minute > 0
    }

    /// Configured per-window limit
    pub fn limit(&self) -> u32 {
        self.requests_per_minute
    }

    /// Check whether a request from `client_id` is admitted.
    ///
    /// Denial is a normal return value, never an error. The entry lock held by
    /// the map serializes admission decisions for a single client.
    pub fn admit(&self, client_id: &str) -> Admission {
        let client_id = normalize(client_id);
        let now = Instant::now();

        let mut entry = self.windows.entry(client_id.to_string()).or_default();
        let requests = entry.value_mut();

        requests.retain(|(ts, _)| now.duration_since(*ts) < self.window);

        let total: u32 = requests.iter().map(|(_, count)| count).sum();

        if total >= self.requests_per_minute {
            warn!(
                "Rate limit exceeded for client {} ({}/{})",
                redact(client_id),
                total,
                self.requests_per_minute
            );
            return Admission {
                allowed: false,
                remaining: 0,
            };
        }

        requests.push((now, 1));

        Admission {
            allowed: true,
            remaining: self.requests_per_minute - total - 1,
        }
    }

    /// Seconds until capacity frees up for `client_id`, floored at 0.
    ///
    /// Returns 0 when the client has no surviving entries.
    pub fn retry_after_seconds(&self, client_id: &str) -> u64 {
        let client_id = normalize(client_id);
        let now = Instant::now();

        let Some(mut entry) = self.windows.get_mut(client_id) else {
            return 0;
        };
        let requests = entry.value_mut();
        requests.retain(|(ts, _)| now.duration_since(*ts) < self.window);

        let Some(oldest) = requests.iter().map(|(ts, _)| *ts).min() else {
            return 0;
        };

        self.window
            .as_secs()
            .saturating_sub(now.duration_since(oldest).as_secs())
    }
}

fn normalize(client_id: &str) -> &str {
    if client_id.is_empty() {
        UNKNOWN_CLIENT
    } else {
        client_id
    }
}

/// Truncate a client identifier for logging, it may be an API key
fn redact(client_id: &str) -> String {
    client_id.chars().take(8).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_admits_up_to_limit_then_denies() {
        let limiter = SlidingWindowLimiter::new(2);

        assert_eq!(
            limiter.admit("A"),
            Admission {
                allowed: true,
                remaining: 1
            }
        );
        assert_eq!(
            limiter.admit("A"),
            Admission {
                allowed: true,
                remaining: 0
            }
        );
        assert_eq!(
            limiter.admit("A"),
            Admission {
                allowed: false,
                remaining: 0
            }
        );

        let retry_after = limiter.retry_after_seconds("A");
        assert!(retry_after > 0 && retry_after <= 60);
    }

    #[test]
    fn test_clients_are_counted_independently() {
        let limiter = SlidingWindowLimiter::new(1);

        assert!(limiter.admit("A").allowed);
        assert!(!limiter.admit("A").allowed);
        assert!(limiter.admit("B").allowed);
    }

    #[test]
    fn test_empty_client_id_uses_unknown_bucket() {
        let limiter = SlidingWindowLimiter::new(1);

        assert!(limiter.admit("").allowed);
        assert!(!limiter.admit(UNKNOWN_CLIENT).allowed);
        assert!(!limiter.admit("").allowed);
    }

    #[test]
    fn test_remaining_never_negative() {
        let limiter = SlidingWindowLimiter::new(3);
        for _ in 0..10 {
            let admission = limiter.admit("A");
            // u32 cannot go negative; denials must report exactly 0
            if !admission.allowed {
                assert_eq!(admission.remaining, 0);
            }
        }
    }

    #[test]
    fn test_window_expiry_restores_capacity() {
        let limiter = SlidingWindowLimiter::with_window(2, Duration::from_millis(50));

        assert!(limiter.admit("A").allowed);
        assert!(limiter.admit("A").allowed);
        assert!(!limiter.admit("A").allowed);

        thread::sleep(Duration::from_millis(60));

        let admission = limiter.admit("A");
        assert!(admission.allowed);
        assert_eq!(admission.remaining, 1);
    }

    #[test]
    fn test_retry_after_without_history_is_zero() {
        let limiter = SlidingWindowLimiter::new(5);
        assert_eq!(limiter.retry_after_seconds("nobody"), 0);
    }

    #[test]
    fn test_rapid_calls_with_identical_timestamps_are_additive() {
        let limiter = SlidingWindowLimiter::new(100);
        for i in 0..100 {
            let admission = limiter.admit("A");
            assert!(admission.allowed);
            assert_eq!(admission.remaining, 99 - i);
        }
        assert!(!limiter.admit("A").allowed);
    }

    #[test]
    fn test_disabled_limiter_reports_disabled() {
        let limiter = SlidingWindowLimiter::new(0);
        assert!(!limiter.enabled());
        assert!(SlidingWindowLimiter::new(60).enabled());
    }

    #[test]
    fn test_concurrent_admissions_respect_limit() {
        use std::sync::Arc;

        let limiter = Arc::new(SlidingWindowLimiter::new(50));
        let mut handles = Vec::new();

        for _ in 0..8 {
            let limiter = Arc::clone(&limiter);
            handles.push(thread::spawn(move || {
                let mut admitted = 0u32;
                for _ in 0..20 {
                    if limiter.admit("shared").allowed {
                        admitted += 1;
                    }
                }
                admitted
            }));
        }

        let total: u32 = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(total, 50);
    }
}
