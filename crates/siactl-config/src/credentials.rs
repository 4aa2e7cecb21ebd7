//! API password lookup.
//!
//! The daemon keeps its API password in a file named `apipassword` inside
//! its data directory. [`ApiPasswordFile`] reads that file; a missing file is
//! a normal absence, not an error. [`EnvOrFileCredentials`] additionally
//! honours the `SIA_API_PASSWORD` override the daemon itself accepts.

use std::fmt;
use std::io::ErrorKind;
use std::path::PathBuf;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::debug;
use zeroize::Zeroize;

use crate::ConfigError;

/// Environment variable that overrides the password file.
pub const API_PASSWORD_ENV: &str = "SIA_API_PASSWORD";
/// Environment variable that overrides the daemon's data directory.
pub const DATA_DIR_ENV: &str = "SIA_DATA_DIR";
/// File name of the password file inside the data directory.
pub const API_PASSWORD_FILE: &str = "apipassword";

/// The daemon API password. Redacted in `Debug`, zeroized on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiPassword {
    inner: String,
}

impl ApiPassword {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            inner: value.into(),
        }
    }

    /// Get the password as a string slice.
    pub fn expose(&self) -> &str {
        &self.inner
    }
}

impl fmt::Debug for ApiPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiPassword")
            .field("inner", &"[REDACTED]")
            .field("len", &self.inner.len())
            .finish()
    }
}

impl Drop for ApiPassword {
    fn drop(&mut self) {
        self.inner.zeroize();
    }
}

impl Serialize for ApiPassword {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.inner)
    }
}

impl<'de> Deserialize<'de> for ApiPassword {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::new)
    }
}

/// Source of the daemon API password used when authentication is `auto`.
///
/// Implementations return `Ok(None)` when no password is available and
/// reserve `Err` for unexpected failures (permissions, unreadable data).
pub trait CredentialSource: Send + Sync {
    fn read_password(&self) -> Result<Option<ApiPassword>, ConfigError>;
}

/// Never yields a password.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCredentials;

impl CredentialSource for NoCredentials {
    fn read_password(&self) -> Result<Option<ApiPassword>, ConfigError> {
        Ok(None)
    }
}

/// Reads the password from an `apipassword` file.
#[derive(Debug, Clone)]
pub struct ApiPasswordFile {
    path: PathBuf,
}

impl ApiPasswordFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The password file inside the daemon's default data directory, if a
    /// data directory can be determined on this platform.
    pub fn default_location() -> Option<Self> {
        default_data_dir().map(|dir| Self::new(dir.join(API_PASSWORD_FILE)))
    }
}

impl CredentialSource for ApiPasswordFile {
    fn read_password(&self) -> Result<Option<ApiPassword>, ConfigError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => {
                let trimmed = content.trim();
                if trimmed.is_empty() {
                    debug!(path = %self.path.display(), "API password file is empty");
                    Ok(None)
                } else {
                    Ok(Some(ApiPassword::new(trimmed)))
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No API password file");
                Ok(None)
            }
            Err(e) => Err(ConfigError::Credentials {
                path: self.path.clone(),
                source: e,
            }),
        }
    }
}

/// Checks an environment variable first, then falls back to a password file.
///
/// This is the default credential source for a client.
#[derive(Debug, Clone)]
pub struct EnvOrFileCredentials {
    env_var: String,
    file: Option<ApiPasswordFile>,
}

impl EnvOrFileCredentials {
    pub fn new(env_var: impl Into<String>, file: Option<ApiPasswordFile>) -> Self {
        Self {
            env_var: env_var.into(),
            file,
        }
    }
}

impl Default for EnvOrFileCredentials {
    fn default() -> Self {
        Self::new(API_PASSWORD_ENV, ApiPasswordFile::default_location())
    }
}

impl CredentialSource for EnvOrFileCredentials {
    fn read_password(&self) -> Result<Option<ApiPassword>, ConfigError> {
        if let Ok(value) = std::env::var(&self.env_var) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                debug!(var = %self.env_var, "API password taken from environment");
                return Ok(Some(ApiPassword::new(trimmed)));
            }
        }
        match &self.file {
            Some(file) => file.read_password(),
            None => Ok(None),
        }
    }
}

/// The daemon's default data directory: `$SIA_DATA_DIR`, else the
/// per-platform location the daemon uses.
pub fn default_data_dir() -> Option<PathBuf> {
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|d| !d.is_empty()) {
        return Some(PathBuf::from(dir));
    }
    platform_data_dir()
}

#[cfg(target_os = "macos")]
fn platform_data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join("Sia"))
}

#[cfg(target_os = "windows")]
fn platform_data_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("Sia"))
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn platform_data_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|d| d.join(".sia"))
}
