//! Rate limiting middleware
//!
//! Applies the sliding-window limiter to every request except the public
//! health and metrics endpoints. The client identifier is the API key when
//! present, the peer address otherwise, and a reserved bucket when neither
//! exists.

use crate::core::{SlidingWindowLimiter, UNKNOWN_CLIENT};
use crate::utils::error::GatewayError;
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header::{HeaderName, HeaderValue};
use futures::future::{ready, Ready};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::debug;

/// Paths exempt from rate limiting
const EXEMPT_PATHS: &[&str] = &["/health", "/metrics"];

/// Rate limit middleware for Actix-web
pub struct RateLimitMiddleware {
    limiter: Arc<SlidingWindowLimiter>,
}

impl RateLimitMiddleware {
    pub fn new(limiter: Arc<SlidingWindowLimiter>) -> Self {
        Self { limiter }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimitMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = actix_web::Error;
    type InitError = ();
    type Transform = RateLimitMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitMiddlewareService {
            service,
            limiter: Arc::clone(&self.limiter),
        }))
    }
}

/// Service implementation for rate limit middleware
pub struct RateLimitMiddlewareService<S> {
    service: S,
    limiter: Arc<SlidingWindowLimiter>,
}

impl<S, B> Service<ServiceRequest> for RateLimitMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = actix_web::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if !self.limiter.enabled() || EXEMPT_PATHS.contains(&req.path()) {
            let fut = self.service.call(req);
            return Box::pin(fut);
        }

        let client_id = client_identifier(&req);
        let admission = self.limiter.admit(&client_id);

        if !admission.allowed {
            let retry_after = self.limiter.retry_after_seconds(&client_id);
            return Box::pin(ready(Err(GatewayError::RateLimit {
                retry_after_secs: retry_after,
            }
            .into())));
        }

        debug!(
            "Rate limit check passed for {} ({} remaining)",
            req.path(),
            admission.remaining
        );

        let limit = self.limiter.limit();
        let fut = self.service.call(req);

        Box::pin(async move {
            let mut res = fut.await?;

            let headers = res.headers_mut();
            headers.insert(
                HeaderName::from_static("x-ratelimit-limit"),
                header_value(limit.to_string()),
            );
            headers.insert(
                HeaderName::from_static("x-ratelimit-remaining"),
                header_value(admission.remaining.to_string()),
            );

            Ok(res)
        })
    }
}

fn header_value(value: String) -> HeaderValue {
    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("0"))
}

/// API key, else source address, else the reserved unknown bucket
fn client_identifier(req: &ServiceRequest) -> String {
    if let Some(key) = req
        .headers()
        .get("x-api-key")
        .and_then(|h| h.to_str().ok())
        .filter(|k| !k.is_empty())
    {
        return key.to_string();
    }

    req.connection_info()
        .peer_addr()
        .map(str::to_string)
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}
