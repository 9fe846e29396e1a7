//! Axum router configuration

use axum::{
    http::{header, Method},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::error::ServerError;
use crate::metrics::metrics_handler;
use crate::state::AppState;

use super::handlers::{health_check, subtitles};

/// Create the Axum router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    // Frontend bundle; unknown paths get index.html for client-side routing
    let static_dir = &state.config.static_dir;
    let frontend = ServeDir::new(static_dir).fallback(ServeFile::new(static_dir.join("index.html")));

    let router = Router::new()
        .route("/api/health", get(health_check))
        .route("/api/subtitles", get(subtitles))
        .route("/api/metrics", get(metrics_handler))
        .fallback_service(frontend)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http());

    let router = if state.config.cors_enabled {
        let cors = CorsLayer::new()
            .allow_origin(AnyOrigin)
            .allow_methods([Method::GET, Method::OPTIONS, Method::HEAD])
            .allow_headers([header::ACCEPT, header::CONTENT_TYPE, header::ORIGIN])
            .max_age(Duration::from_secs(3600));
        router.layer(cors)
    } else {
        router
    };

    router.with_state(state)
}

/// Turn a handler panic into the JSON 500 body
fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!("Handler panicked: {}", message);
    ServerError::Internal(message).into_response()
}
