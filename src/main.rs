//! PolyCore API Server
//!
//! Serves the frontend bundle and the subtitle API.

use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use polycore_server::config_file::load_config;
use polycore_server::http::create_router;
use polycore_server::state::AppState;
use polycore_server::{Result, ServerError};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
const APP_NAME: &str = "polycore-server";

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());
    let (config, warning) = load_config(&config_path);

    // Initialize logging
    init_logging(&config.log_level, &config.log_format);

    tracing::info!("{} v{} starting", APP_NAME, VERSION);
    if let Some(warning) = warning {
        tracing::warn!("{}", warning);
    }
    tracing::info!(
        "Configuration loaded: listen {}, static dir {}, fetcher {:?}",
        config.socket_addr(),
        config.static_dir.display(),
        config.fetcher
    );
    tracing::info!(
        "YOUTUBE_API_KEY: {}",
        if config.youtube_api_key.is_some() {
            "configured"
        } else {
            "not configured"
        }
    );

    let addr: SocketAddr = config
        .socket_addr()
        .parse()
        .map_err(|e| ServerError::Config(format!("invalid listen address: {}", e)))?;

    // Create application state
    let state = Arc::new(AppState::new(config));

    // Build router
    let app = create_router(state);

    // Start server
    tracing::info!("Starting HTTP server on {}", addr);
    tracing::info!("Health check: http://{}/api/health", addr);
    tracing::info!("Subtitles API: http://{}/api/subtitles?videoId=<id>", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

/// Initialize logging with tracing. `RUST_LOG` wins over the configured level.
fn init_logging(level: &str, format: &str) {
    let registry = tracing_subscriber::registry().with(
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| default_filter(level).into()),
    );

    if format.eq_ignore_ascii_case("json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn default_filter(level: &str) -> String {
    format!("polycore_server={},tower_http={}", level, level)
}
