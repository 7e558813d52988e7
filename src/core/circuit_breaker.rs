//! Circuit breaker for calls to external services
//!
//! Tracks consecutive qualifying failures per protected operation and fails
//! fast while the dependency is considered down. After the recovery timeout a
//! single probe is let through; its outcome decides whether the breaker closes
//! again or re-opens.

use crate::utils::error::{GatewayError, Result};
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    /// Calls pass through, failures are counted
    Closed,
    /// Calls fail fast until the recovery timeout elapses
    Open,
    /// One probe call is in flight or pending
    HalfOpen,
}

/// Which error kinds count toward the failure threshold. Validation-style
/// errors from the caller's own payload should not trip a breaker that exists
/// to track upstream availability.
pub type TripPredicate = Arc<dyn Fn(&GatewayError) -> bool + Send + Sync>;

struct BreakerInner {
    state: BreakerState,
    failure_count: u32,
    last_failure: Option<Instant>,
    /// Set while the single half-open probe is in flight
    probe_in_flight: bool,
}

/// Circuit breaker protecting one category of external calls
pub struct CircuitBreaker {
    /// Name used in logs, e.g. "stt" or "llm"
    name: &'static str,
    failure_threshold: u32,
    recovery_timeout: Duration,
    trips_on: TripPredicate,
    inner: Arc<Mutex<BreakerInner>>,
}

impl CircuitBreaker {
    /// Create a breaker that trips on availability-style failures
    /// (network, timeout, upstream errors).
    pub fn new(name: &'static str, failure_threshold: u32, recovery_timeout: Duration) -> Self {
        Self::with_trip_predicate(
            name,
            failure_threshold,
            recovery_timeout,
            Arc::new(|err: &GatewayError| {
                matches!(
                    err.kind(),
                    "network_error" | "timeout_error" | "upstream_error"
                )
            }),
        )
    }

    /// Create a breaker with a custom failure predicate
    pub fn with_trip_predicate(
        name: &'static str,
        failure_threshold: u32,
        recovery_timeout: Duration,
        trips_on: TripPredicate,
    ) -> Self {
        Self {
            name,
            failure_threshold,
            recovery_timeout,
            trips_on,
            inner: Arc::new(Mutex::new(BreakerInner {
                state: BreakerState::Closed,
                failure_count: 0,
                last_failure: None,
                probe_in_flight: false,
            })),
        }
    }

    /// Current state, primarily for tests and diagnostics
    pub fn state(&self) -> BreakerState {
        self.inner.lock().state
    }

    /// Execute `op` under breaker protection.
    ///
    /// While open, fails fast with [`GatewayError::CircuitOpen`] carrying the
    /// remaining cooldown so callers can distinguish it from the operation's
    /// own errors. The internal lock is never held across the await.
    pub async fn execute<T, F, Fut>(&self, op: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let probe_guard = self.admit()?;

        let result = op().await;

        match result {
            Ok(value) => {
                self.on_success(probe_guard);
                Ok(value)
            }
            Err(err) => {
                self.on_failure(&err, probe_guard);
                Err(err)
            }
        }
    }

    /// Decide whether a call may proceed. Returns a guard when the call is
    /// admitted as the half-open probe; abandoning that guard (cancellation)
    /// restores the open state so the breaker cannot wedge half-open.
    fn admit(&self) -> Result<Option<ProbeGuard>> {
        let mut inner = self.inner.lock();

        match inner.state {
            BreakerState::Closed => Ok(None),
            BreakerState::Open => {
                let elapsed = inner
                    .last_failure
                    .map(|at| at.elapsed())
                    .unwrap_or(self.recovery_timeout);

                if elapsed >= self.recovery_timeout {
                    inner.state = BreakerState::HalfOpen;
                    inner.probe_in_flight = true;
                    info!("Circuit breaker {} entering half-open state", self.name);
                    Ok(Some(ProbeGuard::new(Arc::clone(&self.inner))))
                } else {
                    let remaining = self.recovery_timeout - elapsed;
                    Err(GatewayError::CircuitOpen {
                        retry_after_secs: remaining.as_secs().max(1),
                    })
                }
            }
            BreakerState::HalfOpen => {
                if inner.probe_in_flight {
                    // Exactly one probe per open period; everyone else waits
                    Err(GatewayError::CircuitOpen {
                        retry_after_secs: self.remaining_secs(&inner),
                    })
                } else {
                    inner.probe_in_flight = true;
                    Ok(Some(ProbeGuard::new(Arc::clone(&self.inner))))
                }
            }
        }
    }

    fn remaining_secs(&self, inner: &BreakerInner) -> u64 {
        inner
            .last_failure
            .map(|at| {
                self.recovery_timeout
                    .saturating_sub(at.elapsed())
                    .as_secs()
            })
            .unwrap_or(0)
            .max(1)
    }

    fn on_success(&self, probe_guard: Option<ProbeGuard>) {
        let mut inner = self.inner.lock();
        inner.failure_count = 0;

        if let Some(guard) = probe_guard {
            guard.disarm();
            inner.probe_in_flight = false;
            if inner.state == BreakerState::HalfOpen {
                inner.state = BreakerState::Closed;
                info!(
                    "Circuit breaker {} closed after successful recovery",
                    self.name
                );
            }
        }
    }

    fn on_failure(&self, err: &GatewayError, probe_guard: Option<ProbeGuard>) {
        if !(self.trips_on)(err) {
            // Non-qualifying failure: pass through without touching the
            // counter. A probe slot is released so the next caller can retry.
            if let Some(guard) = probe_guard {
                guard.disarm();
                self.inner.lock().probe_in_flight = false;
            }
            return;
        }

        let mut inner = self.inner.lock();
        inner.failure_count += 1;
        inner.last_failure = Some(Instant::now());

        let was_probe = probe_guard.is_some();
        if let Some(guard) = probe_guard {
            guard.disarm();
            inner.probe_in_flight = false;
        }

        if was_probe || inner.failure_count >= self.failure_threshold {
            if inner.state != BreakerState::Open {
                warn!(
                    "Circuit breaker {} opened after {} failures",
                    self.name, inner.failure_count
                );
            }
            inner.state = BreakerState::Open;
        }
    }
}

/// Restores the open state if the probe future is dropped before resolving
struct ProbeGuard {
    inner: Arc<Mutex<BreakerInner>>,
    armed: bool,
}

impl ProbeGuard {
    fn new(inner: Arc<Mutex<BreakerInner>>) -> Self {
        Self { inner, armed: true }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for ProbeGuard {
    fn drop(&mut self) {
        if self.armed {
            let mut inner = self.inner.lock();
            inner.probe_in_flight = false;
            inner.state = BreakerState::Open;
            inner.last_failure = Some(Instant::now());
        }
    }
}
