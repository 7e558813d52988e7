//! Resilience primitives for outbound and inbound traffic
//!
//! Every call to an external service goes through a retry wrapper and a
//! circuit breaker; every inbound request goes through the sliding-window
//! rate limiter. The components are independent: none calls another while
//! holding its own lock.

pub mod circuit_breaker;
pub mod rate_limit;
pub mod retry;

pub use circuit_breaker::{BreakerState, CircuitBreaker};
pub use rate_limit::{Admission, SlidingWindowLimiter, UNKNOWN_CLIENT};
pub use retry::{RetryExecutor, RetryPolicy};
