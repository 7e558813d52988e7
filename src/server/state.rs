//! Application state shared across HTTP handlers

use crate::config::Config;
use crate::core::{CircuitBreaker, RetryExecutor, SlidingWindowLimiter};
use crate::monitoring::MetricsCollector;
use crate::pipeline::{NoteGenerator, SpeechToText};
use std::sync::Arc;

/// HTTP server state shared across handlers
///
/// The resilience components are explicitly constructed here, at the
/// composition root, and injected everywhere else. Tests build fresh
/// instances instead of sharing process globals.
#[derive(Clone)]
pub struct AppState {
    /// Gateway configuration (shared read-only)
    pub config: Arc<Config>,
    /// In-process metrics
    pub metrics: Arc<MetricsCollector>,
    /// Inbound request limiter
    pub rate_limiter: Arc<SlidingWindowLimiter>,
    /// Breaker guarding speech-to-text calls
    pub stt_breaker: Arc<CircuitBreaker>,
    /// Breaker guarding note-generation calls
    pub llm_breaker: Arc<CircuitBreaker>,
    /// Shared retry wrapper for outbound calls
    pub retries: Arc<RetryExecutor>,
    /// Speech-to-text service
    pub stt: Arc<dyn SpeechToText>,
    /// Note-generation service
    pub llm: Arc<dyn NoteGenerator>,
}

impl AppState {
    /// Assemble the state from a configuration plus the two pipeline clients
    pub fn new(config: Config, stt: Arc<dyn SpeechToText>, llm: Arc<dyn NoteGenerator>) -> Self {
        let breaker_config = config.circuit_breaker().clone();
        let recovery = std::time::Duration::from_secs(breaker_config.recovery_timeout_secs);

        Self {
            metrics: Arc::new(MetricsCollector::new(config.pricing().clone())),
            rate_limiter: Arc::new(SlidingWindowLimiter::new(
                config.rate_limit().requests_per_minute,
            )),
            stt_breaker: Arc::new(CircuitBreaker::new(
                "stt",
                breaker_config.failure_threshold,
                recovery,
            )),
            llm_breaker: Arc::new(CircuitBreaker::new(
                "llm",
                breaker_config.failure_threshold,
                recovery,
            )),
            retries: Arc::new(RetryExecutor::new(config.retry().clone())),
            config: Arc::new(config),
            stt,
            llm,
        }
    }
}
