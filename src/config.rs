//! Configuration Module
//!
//! Handles configuration loading from a YAML file, environment variables,
//! and command-line arguments.

use crate::{Result, StaError};
use clap::{Arg, Command};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

fn default_port() -> u16 {
    8080
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind_address: default_bind_address(),
        }
    }
}

/// Durable store backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// In-process store, no external dependency
    Memory,
    /// S3-compatible HTTP endpoint (MinIO etc.), path-style access
    Http,
}

/// Durable store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_backend")]
    pub backend: StoreBackend,
    #[serde(default = "default_store_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_store_bucket")]
    pub bucket: String,
}

fn default_store_backend() -> StoreBackend {
    StoreBackend::Memory
}

fn default_store_endpoint() -> String {
    "http://127.0.0.1:9000".to_string()
}

fn default_store_bucket() -> String {
    "sta-mock".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            endpoint: default_store_endpoint(),
            bucket: default_store_bucket(),
        }
    }
}

/// Basic-auth gate configuration. Credentials default to the upstream
/// service's test pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_auth_enabled")]
    pub enabled: bool,
    #[serde(default = "default_auth_username")]
    pub username: String,
    #[serde(default = "default_auth_password")]
    pub password: String,
}

fn default_auth_enabled() -> bool {
    true
}

fn default_auth_username() -> String {
    "usuarioteste".to_string()
}

fn default_auth_password() -> String {
    "senhateste".to_string()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: default_auth_enabled(),
            username: default_auth_username(),
            password: default_auth_password(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from CLI arguments, the `STA_MOCK_CONFIG` env
    /// var, or defaults, in that order of precedence.
    pub fn load() -> Result<Config> {
        let matches = Command::new("sta-mock")
            .version(env!("CARGO_PKG_VERSION"))
            .about("Mock STA resumable-upload server backed by an S3-compatible store")
            .arg(
                Arg::new("config")
                    .short('c')
                    .long("config")
                    .value_name("FILE")
                    .help("Path to YAML configuration file"),
            )
            .arg(
                Arg::new("port")
                    .short('p')
                    .long("port")
                    .value_name("PORT")
                    .help("Override the listen port"),
            )
            .get_matches();

        let mut config = if let Some(path) = matches.get_one::<String>("config") {
            Self::from_file(Path::new(path))?
        } else if let Ok(path) = std::env::var("STA_MOCK_CONFIG") {
            Self::from_file(Path::new(&path))?
        } else {
            Config::default()
        };

        if let Some(port) = matches.get_one::<String>("port") {
            config.server.port = port
                .parse()
                .map_err(|_| StaError::ConfigError(format!("invalid port: {}", port)))?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file.
    pub fn from_file(path: &Path) -> Result<Config> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            StaError::ConfigError(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(StaError::ConfigError(
                "server port must be non-zero".to_string(),
            ));
        }
        if self.server.bind_address.is_empty() {
            return Err(StaError::ConfigError(
                "bind address cannot be empty".to_string(),
            ));
        }
        if self.store.backend == StoreBackend::Http {
            if !self.store.endpoint.starts_with("http://")
                && !self.store.endpoint.starts_with("https://")
            {
                return Err(StaError::ConfigError(format!(
                    "store endpoint must be an http(s) URL, got {:?}",
                    self.store.endpoint
                )));
            }
            if self.store.bucket.is_empty() {
                return Err(StaError::ConfigError(
                    "store bucket cannot be empty".to_string(),
                ));
            }
        }
        if self.auth.enabled && self.auth.username.is_empty() {
            return Err(StaError::ConfigError(
                "auth username cannot be empty when the auth gate is enabled".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert!(config.auth.enabled);
    }

    #[test]
    fn yaml_overrides_selected_fields() {
        let yaml = r#"
server:
  port: 9090
store:
  backend: http
  endpoint: "http://minio.local:9000"
  bucket: uploads
auth:
  enabled: false
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        config.validate().unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.store.backend, StoreBackend::Http);
        assert_eq!(config.store.bucket, "uploads");
        assert!(!config.auth.enabled);
        // Untouched sections keep their defaults.
        assert_eq!(config.logging.log_level, "info");
    }

    #[test]
    fn http_backend_requires_an_http_endpoint() {
        let mut config = Config::default();
        config.store.backend = StoreBackend::Http;
        config.store.endpoint = "minio.local:9000".to_string();
        assert!(config.validate().is_err());
    }
}
