//! Configuration builders for tests.
//!
//! Use [`TestConfigBuilder`] to create customised [`ClientConfig`] values
//! without repeating struct-update boilerplate across crate boundaries.

use std::path::PathBuf;

use siactl_config::{
    ApiAuthentication, ApiPassword, ClientConfig, ConfigError, CredentialSource, Module,
    ModuleConfig,
};

/// Fluent builder for [`ClientConfig`] in tests.
///
/// # Example
///
/// ```ignore
/// let config = TestConfigBuilder::new()
///     .api_port(1337)
///     .password("foo")
///     .module(Module::Gateway)
///     .build();
/// ```
pub struct TestConfigBuilder {
    config: ClientConfig,
}

impl TestConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
        }
    }

    pub fn api_host(mut self, host: &str) -> Self {
        self.config.api_host = Some(host.to_string());
        self
    }

    pub fn api_port(mut self, port: u16) -> Self {
        self.config.api_port = Some(port);
        self
    }

    pub fn host_port(mut self, port: u16) -> Self {
        self.config.host_port = Some(port);
        self
    }

    pub fn rpc_port(mut self, port: u16) -> Self {
        self.config.rpc_port = Some(port);
        self
    }

    pub fn agent(mut self, agent: &str) -> Self {
        self.config.agent = Some(agent.to_string());
        self
    }

    pub fn authentication(mut self, mode: ApiAuthentication) -> Self {
        self.config.api_authentication = Some(mode);
        self
    }

    /// Set a password and switch authentication on.
    pub fn password(mut self, password: &str) -> Self {
        self.config.api_authentication = Some(ApiAuthentication::Enabled);
        self.config.api_authentication_password = Some(ApiPassword::new(password));
        self
    }

    pub fn data_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.data_directory = Some(dir.into());
        self
    }

    /// Enable one module, creating the module set if needed.
    pub fn module(mut self, module: Module) -> Self {
        self.config
            .modules
            .get_or_insert_with(ModuleConfig::default)
            .set(module, true);
        self
    }

    pub fn modules(mut self, modules: ModuleConfig) -> Self {
        self.config.modules = Some(modules);
        self
    }

    pub fn build(self) -> ClientConfig {
        self.config
    }
}

impl Default for TestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Credentials source that always yields the same answer.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials(pub Option<String>);

impl StaticCredentials {
    pub fn password(password: &str) -> Self {
        Self(Some(password.to_string()))
    }

    pub fn none() -> Self {
        Self(None)
    }
}

impl CredentialSource for StaticCredentials {
    fn read_password(&self) -> Result<Option<ApiPassword>, ConfigError> {
        Ok(self.0.as_deref().map(ApiPassword::new))
    }
}
