//! API key authentication middleware

use crate::utils::error::GatewayError;
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use futures::future::{ready, Ready};
use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, warn};

/// Paths reachable without a key
const PUBLIC_PATHS: &[&str] = &["/health", "/metrics"];

/// API key middleware for Actix-web.
///
/// An empty key set disables authentication entirely; that is only sensible
/// behind a trusted proxy.
pub struct ApiKeyAuthMiddleware {
    api_keys: Arc<HashSet<String>>,
}

impl ApiKeyAuthMiddleware {
    pub fn new(api_keys: &[String]) -> Self {
        Self {
            api_keys: Arc::new(api_keys.iter().cloned().collect()),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for ApiKeyAuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = actix_web::Error;
    type InitError = ();
    type Transform = ApiKeyAuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ApiKeyAuthMiddlewareService {
            service,
            api_keys: Arc::clone(&self.api_keys),
        }))
    }
}

/// Service implementation for API key auth middleware
pub struct ApiKeyAuthMiddlewareService<S> {
    service: S,
    api_keys: Arc<HashSet<String>>,
}

impl<S, B> Service<ServiceRequest> for ApiKeyAuthMiddlewareService<S>
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
        if self.api_keys.is_empty() || PUBLIC_PATHS.contains(&req.path()) {
            return Box::pin(self.service.call(req));
        }

        let api_key = req
            .headers()
            .get("x-api-key")
            .and_then(|h| h.to_str().ok())
            .map(str::to_string);

        match api_key {
            None => {
                warn!("Missing API key for request to {}", req.path());
                Box::pin(ready(Err(GatewayError::auth(
                    "Missing API key. Provide X-API-Key header.",
                )
                .into())))
            }
            Some(key) if !self.api_keys.contains(&key) => {
                warn!(
                    "Invalid API key attempted: {}...",
                    key.chars().take(8).collect::<String>()
                );
                Box::pin(ready(Err(GatewayError::auth("Invalid API key").into())))
            }
            Some(_) => {
                debug!("Authenticated request to {}", req.path());
                Box::pin(self.service.call(req))
            }
        }
    }
}
