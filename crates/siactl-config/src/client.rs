//! Partial client configuration and the merged settings derived from it.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::debug;

use crate::ConfigError;
use crate::credentials::{ApiPassword, CredentialSource};

/// Default host the daemon API listens on.
pub const DEFAULT_API_HOST: &str = "localhost";
/// Default daemon API port.
pub const DEFAULT_API_PORT: u16 = 9980;
/// Default daemon RPC port.
pub const DEFAULT_RPC_PORT: u16 = 9981;
/// Default daemon host port.
pub const DEFAULT_HOST_PORT: u16 = 9982;

/// Characters that would move part of `api_host` into the URL path, query,
/// fragment or userinfo.
const HOST_FORBIDDEN: [char; 4] = ['/', '?', '#', '@'];

/// API authentication mode.
///
/// `Auto` means "authenticate if a password can be found". It is resolved to
/// a plain boolean by [`ClientConfig::resolve`] and never reaches the daemon.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ApiAuthentication {
    #[default]
    Auto,
    Enabled,
    Disabled,
}

impl From<bool> for ApiAuthentication {
    fn from(enabled: bool) -> Self {
        if enabled { Self::Enabled } else { Self::Disabled }
    }
}

impl Serialize for ApiAuthentication {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Auto => serializer.serialize_str("auto"),
            Self::Enabled => serializer.serialize_bool(true),
            Self::Disabled => serializer.serialize_bool(false),
        }
    }
}

impl<'de> Deserialize<'de> for ApiAuthentication {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Flag(bool),
            Mode(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Flag(enabled) => Ok(enabled.into()),
            Repr::Mode(mode) if mode == "auto" => Ok(Self::Auto),
            Repr::Mode(other) => Err(serde::de::Error::custom(format!(
                "api_authentication must be \"auto\", true or false, got {other:?}"
            ))),
        }
    }
}

/// A daemon subsystem that can be toggled with `--modules`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Module {
    Gateway,
    Consensus,
    TransactionPool,
    Wallet,
    Renter,
    Host,
    Miner,
    Explorer,
}

impl Module {
    /// Every module, in the canonical order used when building `--modules`.
    pub const ALL: [Module; 8] = [
        Module::Gateway,
        Module::Consensus,
        Module::TransactionPool,
        Module::Wallet,
        Module::Renter,
        Module::Host,
        Module::Miner,
        Module::Explorer,
    ];

    /// The single-letter code the daemon uses for this module.
    pub fn code(self) -> char {
        match self {
            Module::Gateway => 'g',
            Module::Consensus => 'c',
            Module::TransactionPool => 't',
            Module::Wallet => 'w',
            Module::Renter => 'r',
            Module::Host => 'h',
            Module::Miner => 'm',
            Module::Explorer => 'e',
        }
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Module::Gateway => "gateway",
            Module::Consensus => "consensus",
            Module::TransactionPool => "transactionPool",
            Module::Wallet => "wallet",
            Module::Renter => "renter",
            Module::Host => "host",
            Module::Miner => "miner",
            Module::Explorer => "explorer",
        };
        f.write_str(name)
    }
}

/// Which daemon subsystems to enable. Fields left out of TOML default to `false`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleConfig {
    pub gateway: bool,
    pub consensus: bool,
    #[serde(alias = "transactionPool")]
    pub transaction_pool: bool,
    pub wallet: bool,
    pub renter: bool,
    pub host: bool,
    pub miner: bool,
    pub explorer: bool,
}

impl ModuleConfig {
    /// Whether the given module is enabled.
    pub fn is_enabled(&self, module: Module) -> bool {
        match module {
            Module::Gateway => self.gateway,
            Module::Consensus => self.consensus,
            Module::TransactionPool => self.transaction_pool,
            Module::Wallet => self.wallet,
            Module::Renter => self.renter,
            Module::Host => self.host,
            Module::Miner => self.miner,
            Module::Explorer => self.explorer,
        }
    }

    /// Enable or disable a module.
    pub fn set(&mut self, module: Module, enabled: bool) {
        let slot = match module {
            Module::Gateway => &mut self.gateway,
            Module::Consensus => &mut self.consensus,
            Module::TransactionPool => &mut self.transaction_pool,
            Module::Wallet => &mut self.wallet,
            Module::Renter => &mut self.renter,
            Module::Host => &mut self.host,
            Module::Miner => &mut self.miner,
            Module::Explorer => &mut self.explorer,
        };
        *slot = enabled;
    }

    /// Concatenated codes of every enabled module, in canonical order.
    pub fn codes(&self) -> String {
        Module::ALL
            .into_iter()
            .filter(|m| self.is_enabled(*m))
            .map(Module::code)
            .collect()
    }
}

/// Partial configuration for a daemon client. Unset fields take the
/// documented defaults when resolved.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rpc_port: Option<u16>,
    /// Agent string passed to the daemon and sent as `User-Agent`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_authentication: Option<ApiAuthentication>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_authentication_password: Option<ApiPassword>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_directory: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modules: Option<ModuleConfig>,
    /// Profiling modes (`c`, `m`, `t`) to enable in the daemon.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_directory: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_bootstrap: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_api_security: Option<bool>,
}

impl ClientConfig {
    /// Check ranges and non-empty strings. Port `0` is the only invalid `u16`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ports = [
            ("api_port", self.api_port),
            ("host_port", self.host_port),
            ("rpc_port", self.rpc_port),
        ];
        for (name, port) in ports {
            if port == Some(0) {
                return Err(ConfigError::Validation(format!(
                    "client.{name} must be in 1-65535"
                )));
            }
        }
        if let Some(host) = self.api_host.as_deref() {
            if host.is_empty() {
                return Err(ConfigError::Validation(
                    "client.api_host must not be empty".to_string(),
                ));
            }
            if let Some(c) = host
                .chars()
                .find(|c| HOST_FORBIDDEN.contains(c) || c.is_whitespace())
            {
                return Err(ConfigError::Validation(format!(
                    "client.api_host must be a bare host name or address, found {c:?} in {host:?}"
                )));
            }
        }
        if self.agent.as_deref().is_some_and(str::is_empty) {
            return Err(ConfigError::Validation(
                "client.agent must not be empty".to_string(),
            ));
        }
        if self.profile.as_deref().is_some_and(str::is_empty) {
            return Err(ConfigError::Validation(
                "client.profile must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Merge this configuration over the defaults and resolve `auto`
    /// authentication through `credentials`.
    ///
    /// A password found by `credentials` replaces any configured one. When
    /// none is found the configured password (if any) is kept, and `auto`
    /// becomes `true` only if a password ends up present.
    pub fn resolve(self, credentials: &dyn CredentialSource) -> Result<DaemonSettings, ConfigError> {
        self.validate()?;

        let mut password = self.api_authentication_password;
        let authenticate_api = match self.api_authentication.unwrap_or_default() {
            ApiAuthentication::Auto => {
                if let Some(found) = credentials.read_password()? {
                    debug!("API password loaded from credentials source");
                    password = Some(found);
                }
                password.is_some()
            }
            ApiAuthentication::Enabled => true,
            ApiAuthentication::Disabled => false,
        };

        Ok(DaemonSettings {
            api_host: self.api_host.unwrap_or_else(|| DEFAULT_API_HOST.to_string()),
            api_port: self.api_port.unwrap_or(DEFAULT_API_PORT),
            host_port: self.host_port.unwrap_or(DEFAULT_HOST_PORT),
            rpc_port: self.rpc_port.unwrap_or(DEFAULT_RPC_PORT),
            agent: self.agent,
            authenticate_api,
            api_password: password,
            data_directory: self.data_directory,
            modules: self.modules,
            profile: self.profile,
            profile_directory: self.profile_directory,
            no_bootstrap: self.no_bootstrap.unwrap_or(false),
            disable_api_security: self.disable_api_security.unwrap_or(false),
        })
    }
}

/// Fully merged client settings. Produced once by [`ClientConfig::resolve`].
#[derive(Debug, Clone, PartialEq)]
pub struct DaemonSettings {
    pub api_host: String,
    pub api_port: u16,
    pub host_port: u16,
    pub rpc_port: u16,
    pub agent: Option<String>,
    pub authenticate_api: bool,
    pub api_password: Option<ApiPassword>,
    pub data_directory: Option<PathBuf>,
    pub modules: Option<ModuleConfig>,
    pub profile: Option<String>,
    pub profile_directory: Option<PathBuf>,
    pub no_bootstrap: bool,
    pub disable_api_security: bool,
}
