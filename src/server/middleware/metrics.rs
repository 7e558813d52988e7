//! Metrics middleware for request monitoring
//!
//! Records outcome and latency for every request, exactly once, including
//! requests whose futures are dropped mid-flight by a client disconnect.

use crate::monitoring::MetricsCollector;
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use futures::future::{ready, Ready};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Paths excluded from request metrics, so scrapes do not count themselves
const EXEMPT_PATHS: &[&str] = &["/health", "/metrics"];

/// Metrics middleware for Actix-web
pub struct MetricsMiddleware {
    metrics: Arc<MetricsCollector>,
}

impl MetricsMiddleware {
    pub fn new(metrics: Arc<MetricsCollector>) -> Self {
        Self { metrics }
    }
}

impl<S, B> Transform<S, ServiceRequest> for MetricsMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = actix_web::Error;
    type InitError = ();
    type Transform = MetricsMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(MetricsMiddlewareService {
            service,
            metrics: Arc::clone(&self.metrics),
        }))
    }
}

/// Service implementation for metrics middleware
pub struct MetricsMiddlewareService<S> {
    service: S,
    metrics: Arc<MetricsCollector>,
}

impl<S, B> Service<ServiceRequest> for MetricsMiddlewareService<S>
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
        if EXEMPT_PATHS.contains(&req.path()) {
            let fut = self.service.call(req);
            return Box::pin(fut);
        }

        let method = req.method().to_string();
        let path = req.path().to_string();
        let metrics = Arc::clone(&self.metrics);
        let fut = self.service.call(req);

        Box::pin(async move {
            let mut recorder = OutcomeRecorder::arm(metrics);
            let result = fut.await;

            match &result {
                Ok(res) => {
                    let status = res.status();
                    let success = !status.is_client_error() && !status.is_server_error();
                    let elapsed = recorder.complete(success);
                    info!("{} {} -> {} in {:?}", method, path, status, elapsed);
                }
                Err(err) => {
                    let elapsed = recorder.complete(false);
                    info!("{} {} -> error in {:?}: {}", method, path, elapsed, err);
                }
            }

            result
        })
    }
}

/// Records exactly one request outcome. If the request future is dropped
/// before a response exists (cancellation), the drop path records a failure.
struct OutcomeRecorder {
    metrics: Arc<MetricsCollector>,
    started: Instant,
    armed: bool,
}

impl OutcomeRecorder {
    fn arm(metrics: Arc<MetricsCollector>) -> Self {
        Self {
            metrics,
            started: Instant::now(),
            armed: true,
        }
    }

    fn complete(&mut self, success: bool) -> std::time::Duration {
        self.armed = false;
        let elapsed = self.started.elapsed();
        self.metrics
            .record_request(success, elapsed.as_secs_f64() * 1000.0);
        elapsed
    }
}

impl Drop for OutcomeRecorder {
    fn drop(&mut self) {
        if self.armed {
            let elapsed = self.started.elapsed();
            self.metrics
                .record_request(false, elapsed.as_secs_f64() * 1000.0);
        }
    }
}
