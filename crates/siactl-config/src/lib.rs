#![deny(unsafe_code)]

//! Configuration loading, default merging, and credential lookup for siactl.
//!
//! The [`ClientConfig`] type is the partial, user-facing configuration for a
//! daemon client. Resolving it against a [`CredentialSource`] produces the
//! immutable [`DaemonSettings`] the client runs with. [`AppConfig`] wraps the
//! client configuration together with launcher and logging settings so the
//! whole thing can live in one TOML file.

/// Partial client configuration and its resolved form.
pub mod client;
/// Credentials lookup for the daemon's API password.
pub mod credentials;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub use client::{
    ApiAuthentication, ClientConfig, DEFAULT_API_HOST, DEFAULT_API_PORT, DEFAULT_HOST_PORT,
    DEFAULT_RPC_PORT, DaemonSettings, Module, ModuleConfig,
};
pub use credentials::{
    ApiPassword, ApiPasswordFile, CredentialSource, EnvOrFileCredentials, NoCredentials,
};

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("failed to read API password from {path}: {source}")]
    Credentials {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Top-level application configuration, as stored in `siactl.toml`.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Daemon client configuration (ports, authentication, modules).
    #[serde(default)]
    pub client: ClientConfig,

    /// How the daemon binary is located and how many sockets the client may open.
    #[serde(default)]
    pub launch: LaunchConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Launcher settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaunchConfig {
    /// Path to the `siad` executable.
    #[serde(default = "default_binary")]
    pub binary: PathBuf,

    /// Ceiling on concurrent HTTP connections to the daemon.
    #[serde(default = "default_max_sockets")]
    pub max_sockets: usize,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            max_sockets: default_max_sockets(),
        }
    }
}

fn default_binary() -> PathBuf {
    PathBuf::from("siad")
}

fn default_max_sockets() -> usize {
    30
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g. "info", "debug", "trace").
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load configuration from a TOML file at the given path using async I/O.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.client.validate()?;

        if self.launch.binary.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "launch.binary must not be empty".to_string(),
            ));
        }
        if self.launch.max_sockets == 0 {
            return Err(ConfigError::Validation(
                "launch.max_sockets must be at least 1".to_string(),
            ));
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::Validation(format!(
                "logging.level must be one of {:?}, got {:?}",
                valid_levels, self.logging.level
            )));
        }

        Ok(())
    }
}
