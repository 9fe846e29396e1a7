//! Configuration file support
//!
//! Loads server configuration from TOML files.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::{FetcherConfig, ServerConfig, DEFAULT_FETCH_TIMEOUT_SECS};

/// Configuration file format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Server settings
    pub server: ServerSettings,
    /// Subtitle fetcher settings
    pub fetcher: Option<FetcherSettings>,
    /// Logging settings
    pub logging: Option<LoggingSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Host address to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Directory holding the frontend bundle
    pub static_dir: Option<PathBuf>,
    /// Enable CORS
    pub cors_enabled: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetcherSettings {
    /// Program to execute
    pub program: String,
    /// Arguments placed before the video identifier
    pub args: Option<Vec<String>>,
    /// Working directory
    pub working_dir: Option<PathBuf>,
    /// Timeout in seconds
    pub timeout_secs: Option<u64>,
    /// Maximum concurrent extraction processes
    pub max_concurrent: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Output format (json, pretty)
    pub format: Option<String>,
}

impl ConfigFile {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: ConfigFile = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// Generate default configuration file
    pub fn default_config() -> Self {
        let fetcher = FetcherConfig::default();
        Self {
            server: ServerSettings {
                host: "0.0.0.0".to_string(),
                port: 3001,
                static_dir: Some(PathBuf::from("dist")),
                cors_enabled: Some(true),
            },
            fetcher: Some(FetcherSettings {
                program: fetcher.program,
                args: Some(fetcher.args),
                working_dir: Some(fetcher.working_dir),
                timeout_secs: Some(fetcher.timeout_secs),
                max_concurrent: Some(fetcher.max_concurrent),
            }),
            logging: Some(LoggingSettings {
                level: "info".to_string(),
                format: Some("pretty".to_string()),
            }),
        }
    }

    /// Convert to ServerConfig
    pub fn into_server_config(self) -> ServerConfig {
        let defaults = ServerConfig::default();
        let fetcher = match self.fetcher {
            Some(f) => {
                let base = FetcherConfig::default();
                FetcherConfig {
                    program: f.program,
                    args: f.args.unwrap_or(base.args),
                    working_dir: f.working_dir.unwrap_or(base.working_dir),
                    timeout_secs: f.timeout_secs.unwrap_or(DEFAULT_FETCH_TIMEOUT_SECS),
                    max_concurrent: f.max_concurrent.unwrap_or(base.max_concurrent).max(1),
                }
            }
            None => defaults.fetcher,
        };

        let (log_level, log_format) = match self.logging {
            Some(l) => (l.level, l.format.unwrap_or(defaults.log_format)),
            None => (defaults.log_level, defaults.log_format),
        };

        ServerConfig {
            host: self.server.host,
            port: self.server.port,
            static_dir: self.server.static_dir.unwrap_or(defaults.static_dir),
            fetcher,
            cors_enabled: self.server.cors_enabled.unwrap_or(true),
            log_level,
            log_format,
            youtube_api_key: None,
        }
    }
}

/// Load the configuration at `path`, falling back to defaults when the
/// file is absent, then apply environment overrides.
///
/// A file that exists but cannot be read or parsed also yields defaults;
/// the reason is returned so it can be logged once logging is up.
pub fn load_config<P: AsRef<Path>>(path: P) -> (ServerConfig, Option<String>) {
    let path = path.as_ref();
    let (mut config, warning) = if path.exists() {
        match ConfigFile::from_file(path) {
            Ok(cf) => (cf.into_server_config(), None),
            Err(e) => (
                ServerConfig::default(),
                Some(format!(
                    "Failed to load config file {}: {}. Using defaults.",
                    path.display(),
                    e
                )),
            ),
        }
    } else {
        (ServerConfig::default(), None)
    };
    config.apply_env();
    (config, warning)
}

/// Generate default configuration file at the specified path
pub fn generate_default_config<P: AsRef<Path>>(path: P) -> Result<(), Box<dyn std::error::Error>> {
    let config = ConfigFile::default_config();
    config.to_file(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = ConfigFile::default_config();
        assert_eq!(config.server.port, 3001);
        assert_eq!(config.fetcher.as_ref().unwrap().timeout_secs, Some(30));
    }

    #[test]
    fn test_config_file_roundtrip() {
        let config = ConfigFile::default_config();

        let mut temp_file = NamedTempFile::new().unwrap();
        let content = toml::to_string_pretty(&config).unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();

        let loaded = ConfigFile::from_file(temp_file.path()).unwrap();
        assert_eq!(loaded.server.port, config.server.port);
        assert_eq!(
            loaded.fetcher.unwrap().program,
            config.fetcher.unwrap().program
        );
    }

    #[test]
    fn test_partial_fetcher_section() {
        let toml_text = r#"
            [server]
            host = "127.0.0.1"
            port = 8080

            [fetcher]
            program = "/usr/bin/fetch-subs"
            timeout_secs = 5
        "#;
        let cf: ConfigFile = toml::from_str(toml_text).unwrap();
        let config = cf.into_server_config();

        assert_eq!(config.port, 8080);
        assert_eq!(config.fetcher.program, "/usr/bin/fetch-subs");
        assert_eq!(config.fetcher.timeout_secs, 5);
        assert_eq!(config.fetcher.args, vec!["get_subtitles.py".to_string()]);
        assert_eq!(config.static_dir, PathBuf::from("dist"));
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, "pretty");
    }

    #[test]
    fn test_logging_section() {
        let toml_text = r#"
            [server]
            host = "0.0.0.0"
            port = 3001

            [logging]
            level = "debug"
            format = "json"
        "#;
        let cf: ConfigFile = toml::from_str(toml_text).unwrap();
        let config = cf.into_server_config();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.log_format, "json");

        let cf: ConfigFile = toml::from_str(
            "[server]\nhost = \"0.0.0.0\"\nport = 3001\n[logging]\nlevel = \"warn\"\n",
        )
        .unwrap();
        assert_eq!(cf.into_server_config().log_format, "pretty");
    }

    #[test]
    fn test_zero_concurrency_clamped() {
        let toml_text = r#"
            [server]
            host = "0.0.0.0"
            port = 3001

            [fetcher]
            program = "python3"
            max_concurrent = 0
        "#;
        let cf: ConfigFile = toml::from_str(toml_text).unwrap();
        assert_eq!(cf.into_server_config().fetcher.max_concurrent, 1);
    }

    #[test]
    fn test_generate_default_config() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_path_buf();

        generate_default_config(&path).unwrap();

        assert!(path.exists());
        let loaded = ConfigFile::from_file(&path).unwrap();
        assert_eq!(loaded.server.port, 3001);
    }

    #[test]
    fn test_load_config_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let (config, warning) = load_config(dir.path().join("absent.toml"));
        assert_eq!(config.static_dir, PathBuf::from("dist"));
        assert!(warning.is_none());
    }

    #[test]
    fn test_load_config_bad_file_uses_defaults() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"this is not toml = = =").unwrap();

        let (config, warning) = load_config(temp_file.path());
        assert_eq!(config.host, "0.0.0.0");
        assert!(warning.unwrap().contains("Using defaults"));
    }
}
