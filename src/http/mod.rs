//! HTTP server module
//!
//! This module handles HTTP request routing and handling:
//! - Axum router with the API endpoints
//! - Subtitle and health handlers
//! - Static frontend bundle with client-side routing fallback
//! - CORS and request tracing middleware

pub mod handlers;
pub mod routes;

pub use routes::create_router;
