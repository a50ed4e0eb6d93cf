//! Configuration loading and management
//!
//! Application configuration is read from YAML, overridden from the
//! environment and validated before the server starts:
//!
//! ```yaml
//! server:
//!   host: 0.0.0.0
//!   port: 3000
//! api:
//!   prefix: /api
//!   body_limit: 2097152
//! logging:
//!   level: info
//!   format: compact
//! ```
//!
//! | Variable | Overrides |
//! |---|---|
//! | `APP_HOST`, `NODE_IP` | `server.host` |
//! | `APP_PORT`, `PORT` | `server.port` |
//! | `APP_LOG_LEVEL` | `logging.level` |

use crate::core::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing_subscriber::EnvFilter;
use validator::Validate;

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct AppConfig {
    #[validate(nested)]
    pub server: ServerConfig,

    #[validate(nested)]
    pub api: ApiConfig,

    #[validate(nested)]
    pub logging: LoggingConfig,
}

/// Listening address
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ServerConfig {
    #[validate(length(min = 1))]
    pub host: String,

    #[validate(range(min = 1))]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl ServerConfig {
    /// `host:port`, ready for a listener
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Route mounting and dispatch limits
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ApiConfig {
    /// Prefix every service namespace is mounted under
    #[validate(custom(function = "validate_prefix"))]
    pub prefix: String,

    /// Largest accepted request body, in bytes
    #[validate(range(min = 1))]
    pub body_limit: usize,

    /// Buffer of the lifecycle event channel
    #[validate(range(min = 1))]
    pub event_bus_capacity: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            prefix: "/api".to_string(),
            body_limit: 2 * 1024 * 1024,
            event_bus_capacity: 1024,
        }
    }
}

/// Log output
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    #[validate(length(min = 1))]
    pub level: String,

    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
}

fn validate_prefix(prefix: &String) -> Result<(), validator::ValidationError> {
    if prefix.starts_with('/') && !prefix.ends_with('/') {
        Ok(())
    } else {
        let mut err = validator::ValidationError::new("prefix");
        err.message = Some("must start with '/' and must not end with '/'".into());
        Err(err)
    }
}

impl AppConfig {
    /// Load from a YAML file, apply environment overrides and validate
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let mut config = Self::from_yaml_file(path)?;
        config.apply_env_overrides()?;
        config.check()?;
        Ok(config)
    }

    /// Parse a YAML file without validating
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
            file: Some(path.display().to_string()),
            message: e.to_string(),
        })
    }

    /// Parse a YAML string and validate it
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.check()?;
        Ok(config)
    }

    /// Apply overrides from the process environment
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any variable source
    pub fn apply_overrides<F>(&mut self, var: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let first = |keys: &[&str]| keys.iter().find_map(|key| var(key));

        if let Some(host) = first(&["APP_HOST", "NODE_IP"]) {
            self.server.host = host;
        }

        if let Some(port) = first(&["APP_PORT", "PORT"]) {
            self.server.port = port.trim().parse().map_err(|_| ConfigError::InvalidValue {
                field: "server.port".to_string(),
                message: format!("'{}' is not a valid port", port),
            })?;
        }

        if let Some(level) = var("APP_LOG_LEVEL") {
            self.logging.level = level;
        }

        Ok(())
    }

    /// Run the declarative validation rules
    pub fn check(&self) -> Result<(), ConfigError> {
        self.validate().map_err(|errors| ConfigError::InvalidValue {
            field: "config".to_string(),
            message: errors.to_string(),
        })
    }
}

/// Install the global tracing subscriber
///
/// `RUST_LOG` wins over the configured level. Returns `false` when a global
/// subscriber was already installed.
pub fn init_tracing(config: &LoggingConfig) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let installed = match config.format {
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    };
    installed.is_ok()
}
