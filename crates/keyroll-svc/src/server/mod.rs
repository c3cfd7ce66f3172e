//! Axum HTTP server, routing, and middleware.
//!
//! # Responsibilities
//! - Define the Axum router with all routes and shared middleware.
//! - Inject the shared key profile registry (`AppState`) into handlers.
//! - Translate sealing errors into JSON error responses.

pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;
