//! Server configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default time an extraction process may run before it is killed
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Subtitle fetcher configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FetcherConfig {
    /// Program to execute
    pub program: String,

    /// Arguments placed before the video identifier
    pub args: Vec<String>,

    /// Working directory for the process (the server root)
    pub working_dir: PathBuf,

    /// Seconds before the process is killed
    pub timeout_secs: u64,

    /// Maximum number of extraction processes running at once
    pub max_concurrent: usize,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            program: "python3".to_string(),
            args: vec!["get_subtitles.py".to_string()],
            working_dir: PathBuf::from("."),
            timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            max_concurrent: 4,
        }
    }
}

impl FetcherConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Directory holding the pre-built frontend bundle
    pub static_dir: PathBuf,

    /// Subtitle fetcher configuration
    pub fetcher: FetcherConfig,

    /// Enable CORS
    pub cors_enabled: bool,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Log output format (`pretty` or `json`)
    pub log_format: String,

    /// Video data API key. Read at startup, not used by any endpoint.
    #[serde(skip_serializing)]
    pub youtube_api_key: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            static_dir: PathBuf::from("dist"),
            fetcher: FetcherConfig::default(),
            cors_enabled: true,
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            youtube_api_key: None,
        }
    }
}

impl ServerConfig {
    /// Get the socket address string
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Apply `PORT` and `YOUTUBE_API_KEY` from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Apply environment overrides using the given lookup.
    ///
    /// An unparsable `PORT` is ignored with a warning.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            match port.trim().parse::<u16>() {
                Ok(p) => self.port = p,
                Err(e) => tracing::warn!("Ignoring invalid PORT {:?}: {}", port, e),
            }
        }

        self.youtube_api_key = lookup("YOUTUBE_API_KEY")
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());
    }
}
