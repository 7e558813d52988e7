//! Error handling for the gateway
//!
//! This module defines all error types used throughout the gateway.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

/// Result type alias for the gateway
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Main error type for the gateway
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Authentication errors
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Request validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Rate limit denials, carrying the seconds until the window resets
    #[error("Rate limit exceeded. Retry after {retry_after_secs} seconds.")]
    RateLimit {
        /// Seconds until the client may retry
        retry_after_secs: u64,
    },

    /// Circuit breaker fail-fast, carrying the remaining cooldown
    #[error("Service temporarily unavailable. Retry after {retry_after_secs} seconds.")]
    CircuitOpen {
        /// Seconds until the breaker may admit a probe
        retry_after_secs: u64,
    },

    /// Upstream service returned a server-side failure
    #[error("Upstream error from {service}: {message}")]
    Upstream {
        /// Which external service failed
        service: &'static str,
        /// Error detail from the service
        message: String,
    },

    /// Network-level failures reaching an upstream service
    #[error("Network error: {0}")]
    Network(String),

    /// Upstream call exceeded its deadline
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// Internal server errors
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Stable kind name, used by the retry and circuit breaker predicates
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config_error",
            Self::Io(_) => "io_error",
            Self::Serialization(_) => "serialization_error",
            Self::Yaml(_) => "yaml_error",
            Self::Auth(_) => "auth_error",
            Self::Validation(_) => "validation_error",
            Self::RateLimit { .. } => "rate_limit",
            Self::CircuitOpen { .. } => "circuit_open",
            Self::Upstream { .. } => "upstream_error",
            Self::Network(_) => "network_error",
            Self::Timeout(_) => "timeout_error",
            Self::Internal(_) => "internal_error",
        }
    }

    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    pub fn auth<S: Into<String>>(message: S) -> Self {
        Self::Auth(message.into())
    }

    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation(message.into())
    }

    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::Network(message.into())
    }

    pub fn timeout<S: Into<String>>(message: S) -> Self {
        Self::Timeout(message.into())
    }

    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }

    pub fn upstream<S: Into<String>>(service: &'static str, message: S) -> Self {
        Self::Upstream {
            service,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() || err.is_request() {
            Self::Network(err.to_string())
        } else {
            Self::Internal(err.to_string())
        }
    }
}

impl ResponseError for GatewayError {
    fn error_response(&self) -> HttpResponse {
        let (status_code, error_code, message) = match self {
            GatewayError::Auth(_) => (StatusCode::UNAUTHORIZED, "AUTH_ERROR", self.to_string()),
            GatewayError::Validation(_) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", self.to_string())
            }
            GatewayError::RateLimit { .. } => (
                StatusCode::TOO_MANY_REQUESTS,
                "RATE_LIMIT_EXCEEDED",
                self.to_string(),
            ),
            GatewayError::CircuitOpen { .. } => (
                StatusCode::SERVICE_UNAVAILABLE,
                "CIRCUIT_BREAKER_OPEN",
                self.to_string(),
            ),
            GatewayError::Upstream { .. } => {
                (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", self.to_string())
            }
            GatewayError::Network(_) => (StatusCode::BAD_GATEWAY, "NETWORK_ERROR", self.to_string()),
            GatewayError::Timeout(_) => (
                StatusCode::GATEWAY_TIMEOUT,
                "TIMEOUT_ERROR",
                self.to_string(),
            ),
            GatewayError::Config(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "CONFIG_ERROR",
                self.to_string(),
            ),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            ),
        };

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: error_code.to_string(),
                message,
                timestamp: chrono::Utc::now().timestamp(),
                request_id: None,
            },
        };

        let mut builder = HttpResponse::build(status_code);

        // Rate-limit and breaker denials carry a Retry-After hint
        match self {
            GatewayError::RateLimit { retry_after_secs }
            | GatewayError::CircuitOpen { retry_after_secs } => {
                builder.insert_header(("Retry-After", retry_after_secs.to_string()));
            }
            _ => {}
        }

        builder.json(error_response)
    }
}

/// Standard error response format
#[derive(serde::Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

/// Error detail structure
#[derive(serde::Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    pub timestamp: i64,
    pub request_id: Option<String>,
}
