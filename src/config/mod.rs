//! Configuration management for the gateway
//!
//! Configuration loads from a YAML file, from environment variables, or both
//! (environment takes precedence over the file).

pub mod models;

pub use models::*;

use crate::utils::error::{GatewayError, Result};
use std::env;
use std::path::Path;
use tracing::{debug, info};

/// Main configuration struct for the gateway
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub gateway: GatewayConfig,
}

impl Config {
    /// Load configuration from a YAML file, then apply env overrides
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from: {:?}", path);

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| GatewayError::Config(format!("Failed to read config file: {}", e)))?;

        let mut gateway: GatewayConfig = serde_yaml::from_str(&content)
            .map_err(|e| GatewayError::Config(format!("Failed to parse config: {}", e)))?;

        apply_env_overrides(&mut gateway)?;

        let config = Self { gateway };
        config.validate()?;

        debug!("Configuration loaded successfully");
        Ok(config)
    }

    /// Load configuration from environment variables over built-in defaults
    pub fn from_env() -> Result<Self> {
        info!("Loading configuration from environment variables");

        let mut gateway = GatewayConfig::default();
        apply_env_overrides(&mut gateway)?;

        let config = Self { gateway };
        config.validate()?;
        Ok(config)
    }

    pub fn server(&self) -> &ServerConfig {
        &self.gateway.server
    }

    pub fn auth(&self) -> &AuthConfig {
        &self.gateway.auth
    }

    pub fn rate_limit(&self) -> &RateLimitConfig {
        &self.gateway.rate_limit
    }

    pub fn circuit_breaker(&self) -> &CircuitBreakerConfig {
        &self.gateway.circuit_breaker
    }

    pub fn retry(&self) -> &crate::core::retry::RetryPolicy {
        &self.gateway.retry
    }

    pub fn pricing(&self) -> &PricingConfig {
        &self.gateway.pricing
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        debug!("Validating configuration");

        if self.gateway.server.port == 0 {
            return Err(GatewayError::Config("Server port must be non-zero".into()));
        }
        if self.gateway.retry.max_attempts == 0 {
            return Err(GatewayError::Config(
                "retry.max_attempts must be at least 1".into(),
            ));
        }
        if self.gateway.retry.backoff_factor < 1.0 {
            return Err(GatewayError::Config(
                "retry.backoff_factor must be >= 1.0".into(),
            ));
        }
        if self.gateway.circuit_breaker.failure_threshold == 0 {
            return Err(GatewayError::Config(
                "circuit_breaker.failure_threshold must be at least 1".into(),
            ));
        }

        debug!("Configuration validation completed");
        Ok(())
    }
}

fn apply_env_overrides(config: &mut GatewayConfig) -> Result<()> {
    if let Ok(host) = env::var("SCRIBE_HOST") {
        config.server.host = host;
    }
    if let Ok(port) = env::var("SCRIBE_PORT") {
        config.server.port = port
            .parse()
            .map_err(|e| GatewayError::Config(format!("Invalid port: {}", e)))?;
    }
    if let Ok(keys) = env::var("SCRIBE_API_KEYS") {
        config.auth.api_keys = keys
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect();
    }

    if let Ok(rpm) = env::var("RATE_LIMIT_RPM") {
        config.rate_limit.requests_per_minute = rpm
            .parse()
            .map_err(|e| GatewayError::Config(format!("Invalid rate limit: {}", e)))?;
    }

    if let Ok(threshold) = env::var("CIRCUIT_FAILURE_THRESHOLD") {
        config.circuit_breaker.failure_threshold = threshold
            .parse()
            .map_err(|e| GatewayError::Config(format!("Invalid failure threshold: {}", e)))?;
    }
    if let Ok(timeout) = env::var("CIRCUIT_RECOVERY_TIMEOUT_SECS") {
        config.circuit_breaker.recovery_timeout_secs = timeout
            .parse()
            .map_err(|e| GatewayError::Config(format!("Invalid recovery timeout: {}", e)))?;
    }

    if let Ok(attempts) = env::var("RETRY_MAX_ATTEMPTS") {
        config.retry.max_attempts = attempts
            .parse()
            .map_err(|e| GatewayError::Config(format!("Invalid retry attempts: {}", e)))?;
    }
    if let Ok(delay) = env::var("RETRY_INITIAL_DELAY_MS") {
        config.retry.initial_delay_ms = delay
            .parse()
            .map_err(|e| GatewayError::Config(format!("Invalid initial delay: {}", e)))?;
    }
    if let Ok(factor) = env::var("RETRY_BACKOFF_FACTOR") {
        config.retry.backoff_factor = factor
            .parse()
            .map_err(|e| GatewayError::Config(format!("Invalid backoff factor: {}", e)))?;
    }
    if let Ok(max_delay) = env::var("RETRY_MAX_DELAY_MS") {
        config.retry.max_delay_ms = max_delay
            .parse()
            .map_err(|e| GatewayError::Config(format!("Invalid max delay: {}", e)))?;
    }

    if let Ok(endpoint) = env::var("STT_ENDPOINT") {
        config.stt.endpoint = endpoint;
    }
    if let Ok(key) = env::var("STT_API_KEY") {
        config.stt.api_key = key;
    }
    if let Ok(endpoint) = env::var("LLM_ENDPOINT") {
        config.llm.endpoint = endpoint;
    }
    if let Ok(key) = env::var("LLM_API_KEY") {
        config.llm.api_key = key;
    }
    if let Ok(model) = env::var("LLM_MODEL_ID") {
        config.llm.model_id = model;
    }

    Ok(())
}
