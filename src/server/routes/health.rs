//! Health check and operator metrics endpoints

use crate::server::routes::ApiResponse;
use crate::server::state::AppState;
use actix_web::{web, HttpResponse, Result as ActixResult};
use std::borrow::Cow;
use tracing::debug;

/// Configure health and metrics routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/metrics", web::get().to(metrics));
}

#[derive(serde::Serialize)]
struct HealthStatus {
    status: Cow<'static, str>,
    version: Cow<'static, str>,
    timestamp: chrono::DateTime<chrono::Utc>,
}

/// Basic health check endpoint, used by load balancers
pub async fn health_check() -> ActixResult<HttpResponse> {
    debug!("Health check requested");

    let health_status = HealthStatus {
        status: Cow::Borrowed("healthy"),
        version: Cow::Borrowed(env!("CARGO_PKG_VERSION")),
        timestamp: chrono::Utc::now(),
    };

    Ok(HttpResponse::Ok().json(ApiResponse::success(health_status)))
}

/// Operator-facing metrics snapshot
pub async fn metrics(state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    debug!("Metrics snapshot requested");
    Ok(HttpResponse::Ok().json(state.metrics.snapshot()))
}
