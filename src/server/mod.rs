//! HTTP server implementation
//!
//! This module provides the HTTP server, middleware chain, and routes.

pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;


pub use server::{run_server, HttpServer};
pub use state::AppState;
