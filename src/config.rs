//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::api::ApiConfig;
use crate::broadcast::HubConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ApiConfig,

    #[serde(default)]
    pub hub: HubConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable, for development
    #[default]
    Pretty,
    /// One JSON object per line, for journald and log shippers
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        // Try default config locations
        let config_paths = [
            dirs::config_dir().map(|p| p.join("pitwall").join("config.toml")),
            Some(PathBuf::from("/etc/pitwall/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        // Fall back to environment-only config
        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Reject values the hub cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hub.buffer_capacity == 0 {
            return Err(ConfigError::Invalid(
                "hub.buffer_capacity must be at least 1".to_string(),
            ));
        }
        if self.hub.keep_alive_secs == 0 {
            return Err(ConfigError::Invalid(
                "hub.keep_alive_secs must be at least 1".to_string(),
            ));
        }
        if self.server.max_body_size == 0 {
            return Err(ConfigError::Invalid(
                "server.max_body_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        // Server overrides
        if let Some(host) = var("PITWALL_HOST") {
            self.server.host = host;
        }
        // PORT is the plain variable process managers set; PITWALL_PORT wins
        for key in ["PORT", "PITWALL_PORT"] {
            if let Some(port) = var(key) {
                match port.parse() {
                    Ok(p) => self.server.port = p,
                    Err(_) => tracing::warn!("Ignoring invalid {}={:?}", key, port),
                }
            }
        }

        // Hub overrides
        if let Some(capacity) = var("PITWALL_BUFFER_CAPACITY") {
            match capacity.parse() {
                Ok(c) => self.hub.buffer_capacity = c,
                Err(_) => tracing::warn!("Ignoring invalid PITWALL_BUFFER_CAPACITY={:?}", capacity),
            }
        }
        if let Some(secs) = var("PITWALL_KEEP_ALIVE_SECS") {
            match secs.parse() {
                Ok(s) => self.hub.keep_alive_secs = s,
                Err(_) => tracing::warn!("Ignoring invalid PITWALL_KEEP_ALIVE_SECS={:?}", secs),
            }
        }

        // Logging overrides
        if let Some(level) = var("PITWALL_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("PITWALL_LOG_FORMAT") {
            match format.parse() {
                Ok(f) => self.logging.format = f,
                Err(e) => tracing::warn!("Ignoring PITWALL_LOG_FORMAT: {}", e),
            }
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Pitwall Configuration
#
# Environment variables override these settings:
# - PITWALL_HOST
# - PITWALL_PORT (or PORT)
# - PITWALL_BUFFER_CAPACITY
# - PITWALL_KEEP_ALIVE_SECS
# - PITWALL_LOG_LEVEL
# - PITWALL_LOG_FORMAT

[server]
# Address to bind
host = "0.0.0.0"

# Port for both ingestion (POST /data) and viewers (GET /events)
port = 5000

# Largest accepted telemetry body (bytes)
max_body_size = 1048576

# Allowed CORS origins; leave empty to allow any origin
cors_origins = []

[hub]
# Frames a viewer may fall behind before it is dropped
buffer_capacity = 100

# Idle seconds before a keep-alive comment is sent to a viewer
keep_alive_secs = 30

[logging]
# Log level: trace, debug, info, warn, error (RUST_LOG takes precedence)
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.hub.buffer_capacity, 100);
        assert_eq!(config.hub.keep_alive_secs, 30);
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_config_file_parses() {
        let file = write_config(&generate_default_config());
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.server.max_body_size, 1024 * 1024);
        assert_eq!(config.hub.buffer_capacity, 100);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let file = write_config(
            r#"
[hub]
keep_alive_secs = 15

[logging]
format = "json"
"#,
        );
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.hub.keep_alive_secs, 15);
        assert_eq!(config.hub.buffer_capacity, 100);
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_rejects_zero_capacity() {
        let file = write_config("[hub]\nbuffer_capacity = 0\n");
        assert!(matches!(
            Config::load(file.path()),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_parse_error() {
        let file = write_config("[server\nport = ");
        assert!(matches!(
            Config::load(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        let result = Config::load(Path::new("/nonexistent/pitwall.toml"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("PORT", "8000"),
            ("PITWALL_HOST", "127.0.0.1"),
            ("PITWALL_BUFFER_CAPACITY", "250"),
            ("PITWALL_LOG_FORMAT", "JSON"),
            ("PITWALL_KEEP_ALIVE_SECS", "soon"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.hub.buffer_capacity, 250);
        assert_eq!(config.logging.format, LogFormat::Json);
        // Unparsable values leave the default in place
        assert_eq!(config.hub.keep_alive_secs, 30);
    }

    #[test]
    fn test_pitwall_port_beats_port() {
        let mut config = Config::default();
        config.apply_overrides(|key| match key {
            "PORT" => Some("8000".to_string()),
            "PITWALL_PORT" => Some("9000".to_string()),
            _ => None,
        });
        assert_eq!(config.server.port, 9000);
    }
}
