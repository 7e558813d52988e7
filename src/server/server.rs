//! HTTP server core implementation

use crate::config::Config;
use crate::pipeline::{HttpLlmClient, HttpSttClient};
use crate::server::middleware::{
    ApiKeyAuthMiddleware, MetricsMiddleware, RateLimitMiddleware, RequestIdMiddleware,
};
use crate::server::routes;
use crate::server::state::AppState;
use crate::utils::error::{GatewayError, Result};
use actix_cors::Cors;
use actix_web::{web, App, HttpServer as ActixHttpServer};
use std::sync::Arc;
use tracing::info;

/// HTTP server
pub struct HttpServer {
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server with reqwest-backed pipeline clients
    pub fn new(config: Config) -> Result<Self> {
        info!("Creating HTTP server");

        let stt = Arc::new(HttpSttClient::new(&config.gateway.stt)?);
        let llm = Arc::new(HttpLlmClient::new(&config.gateway.llm)?);

        Ok(Self {
            state: AppState::new(config, stt, llm),
        })
    }

    /// Create a server over pre-built state, used by tests to inject mocks
    pub fn with_state(state: AppState) -> Self {
        Self { state }
    }

    /// Bind and run until shutdown
    pub async fn start(self) -> Result<()> {
        let server_config = self.state.config.server().clone();
        let bind_addr = (server_config.host.clone(), server_config.port);
        let state = self.state;

        info!(
            "Starting HTTP server on {}:{}",
            server_config.host, server_config.port
        );

        let mut server = ActixHttpServer::new(move || {
            // Wrapping order is reversed at runtime: request ID first, then
            // metrics, auth, and the rate limiter closest to the handler
            App::new()
                .app_data(web::Data::new(state.clone()))
                .wrap(RateLimitMiddleware::new(Arc::clone(&state.rate_limiter)))
                .wrap(ApiKeyAuthMiddleware::new(&state.config.auth().api_keys))
                .wrap(MetricsMiddleware::new(Arc::clone(&state.metrics)))
                .wrap(RequestIdMiddleware)
                .wrap(Cors::permissive())
                .configure(routes::configure_routes)
        });

        if let Some(workers) = server_config.workers {
            server = server.workers(workers);
        }

        server
            .bind(bind_addr)
            .map_err(|e| GatewayError::Config(format!("Failed to bind server: {}", e)))?
            .run()
            .await
            .map_err(GatewayError::Io)
    }
}

/// Load configuration and run the server
pub async fn run_server() -> Result<()> {
    let config = match std::env::var("SCRIBE_CONFIG") {
        Ok(path) => Config::from_file(path).await?,
        Err(_) => Config::from_env()?,
    };

    HttpServer::new(config)?.start().await
}
