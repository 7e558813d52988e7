//! HTTP middleware implementations
//!
//! Request processing order is: request ID, metrics, authentication, rate
//! limiting, handler. Metrics sits outside auth and the limiter so denials
//! are recorded like any other outcome.

mod auth;
mod metrics;
mod rate_limit;
mod request_id;

#[cfg(test)]
mod tests;

pub use auth::{ApiKeyAuthMiddleware, ApiKeyAuthMiddlewareService};
pub use metrics::{MetricsMiddleware, MetricsMiddlewareService};
pub use rate_limit::{RateLimitMiddleware, RateLimitMiddlewareService};
pub use request_id::{RequestIdMiddleware, RequestIdMiddlewareService};
