//! # Scribe Gateway
//!
//! Resilience and telemetry layer for a clinical-dictation gateway. The
//! service accepts a dictation (transcript text or an audio URL plus
//! patient context) over HTTP and produces a structured clinical note by
//! calling external speech-to-text and LLM services.
//!
//! ## Features
//!
//! - **Sliding-window rate limiting**: per-client admission control keyed
//!   by API key, with quota headers on every allowed response
//! - **Circuit breakers**: one per upstream service, with a single-probe
//!   half-open recovery path
//! - **Retry with backoff**: exponential backoff for transient upstream
//!   failures, never for open breakers or caller mistakes
//! - **In-process metrics**: request outcomes, latency, session gauge, and
//!   running cost estimates exposed at `/metrics`
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scribe_gateway::Config;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_file("config/gateway.yaml").await?;
//!     let server = scribe_gateway::server::HttpServer::new(config)?;
//!     server.start().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod monitoring;
pub mod pipeline;
pub mod server;
pub mod utils;

// Primary exports
pub use config::Config;
pub use utils::error::{GatewayError, Result};

pub use core::{CircuitBreaker, RetryExecutor, RetryPolicy, SlidingWindowLimiter};
pub use monitoring::{MetricsCollector, MetricsSnapshot};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
