//! Daemon client that launches `siad` and talks to its local REST API.
//!
//! A [`SiaClient`] holds the merged [`DaemonSettings`], one shared HTTP
//! connection pool, and at most one tracked [`DaemonProcess`]. Settings never
//! change after construction.
//!
//! ```text
//! ClientConfig ──resolve──▶ DaemonSettings ──build_flags──▶ siad <flags…>
//!                                │
//!                                └──▶ http://<host>:<port>/<endpoint>
//! ```

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::ACCEPT;
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, info, warn};

use siactl_config::{
    ClientConfig, ConfigError, CredentialSource, DaemonSettings, EnvOrFileCredentials,
};

use crate::error::ClientError;
use crate::flags::build_flags;
use crate::identity;
use crate::launcher::{DaemonProcess, ProcessLauncher, SpawnRequest, TokioLauncher};
use crate::types::{DaemonVersion, ErrorResponse, GatewayInfo};

/// `User-Agent` sent when the config does not name an agent. The daemon
/// rejects most requests from other agents.
pub const DEFAULT_USER_AGENT: &str = "Sia-Agent";
/// Default ceiling on concurrent connections to the daemon.
pub const DEFAULT_MAX_SOCKETS: usize = 30;
/// Pool-level limit on establishing a connection to the daemon.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Timeout for a whole request when the caller names none.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// A single API call. Unset options fall back to the client's defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub endpoint: String,
    pub method: Method,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub timeout: Option<Duration>,
}

impl ApiRequest {
    /// A `GET` request for `endpoint`.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            method: Method::GET,
            query: Vec::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Append a query-string pair.
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Send `body` as JSON.
    pub fn with_json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The timeout this request runs with.
    pub fn effective_timeout(&self) -> Duration {
        self.timeout.unwrap_or(DEFAULT_CALL_TIMEOUT)
    }
}

impl From<&str> for ApiRequest {
    fn from(endpoint: &str) -> Self {
        Self::new(endpoint)
    }
}

impl From<String> for ApiRequest {
    fn from(endpoint: String) -> Self {
        Self::new(endpoint)
    }
}

/// Builder for [`SiaClient`]; lets callers inject the launcher and the
/// credentials source.
pub struct ClientBuilder {
    config: ClientConfig,
    launcher: Arc<dyn ProcessLauncher>,
    credentials: Box<dyn CredentialSource>,
    max_sockets: usize,
}

impl ClientBuilder {
    fn new(config: ClientConfig) -> Self {
        Self {
            config,
            launcher: Arc::new(TokioLauncher),
            credentials: Box::new(EnvOrFileCredentials::default()),
            max_sockets: DEFAULT_MAX_SOCKETS,
        }
    }

    /// Use `launcher` instead of [`TokioLauncher`].
    pub fn launcher(mut self, launcher: Arc<dyn ProcessLauncher>) -> Self {
        self.launcher = launcher;
        self
    }

    /// Source consulted when authentication is `auto`.
    pub fn credentials(mut self, credentials: impl CredentialSource + 'static) -> Self {
        self.credentials = Box::new(credentials);
        self
    }

    /// Ceiling on concurrent connections. Excess requests queue.
    pub fn max_sockets(mut self, max_sockets: usize) -> Self {
        self.max_sockets = max_sockets;
        self
    }

    /// Merge defaults, resolve credentials, and allocate the connection pool.
    pub fn build(self) -> Result<SiaClient, ClientError> {
        if let Some(dir) = &self.config.data_directory
            && !dir.exists()
        {
            // The daemon creates its data directory on first start.
            warn!(path = %dir.display(), "Data directory does not exist yet");
        }

        if self.max_sockets == 0 {
            return Err(ConfigError::Validation("max_sockets must be at least 1".to_string()).into());
        }

        let settings = self.config.resolve(self.credentials.as_ref())?;

        let agent = settings.agent.as_deref().unwrap_or(DEFAULT_USER_AGENT);
        let http = reqwest::Client::builder()
            .user_agent(agent)
            .pool_max_idle_per_host(self.max_sockets)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .tcp_keepalive(Duration::from_secs(60))
            .build()
            .map_err(|e| ConfigError::Validation(format!("failed to build HTTP client: {e}")))?;

        debug!(
            host = %settings.api_host,
            port = settings.api_port,
            authenticate = settings.authenticate_api,
            max_sockets = self.max_sockets,
            "Daemon client configured"
        );

        Ok(SiaClient {
            settings,
            http,
            sockets: Semaphore::new(self.max_sockets),
            launcher: self.launcher,
            process: Mutex::new(None),
        })
    }
}

/// Client for a single `siad` instance.
///
/// All methods take `&self`; share the client behind an `Arc` to use it from
/// several tasks.
pub struct SiaClient {
    settings: DaemonSettings,
    http: reqwest::Client,
    sockets: Semaphore,
    launcher: Arc<dyn ProcessLauncher>,
    /// Tracked process. The lock is held for the whole of `launch`, which
    /// serializes concurrent launches.
    process: Mutex<Option<DaemonProcess>>,
}

impl SiaClient {
    /// Build a client with the default launcher and credentials source.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        Self::builder(config).build()
    }

    pub fn builder(config: ClientConfig) -> ClientBuilder {
        ClientBuilder::new(config)
    }

    /// The merged settings this client runs with.
    pub fn settings(&self) -> &DaemonSettings {
        &self.settings
    }

    /// Flags `launch` would pass to the daemon.
    pub fn flags(&self) -> Vec<String> {
        build_flags(&self.settings)
    }

    /// Start the daemon binary at `binary` and track the resulting process.
    ///
    /// Fails with [`ClientError::BinaryNotFound`] without touching the
    /// launcher when the path does not exist. A second call replaces the
    /// tracked handle; the earlier process keeps running. Returns as soon as
    /// the process is spawned, without waiting for the API to come up.
    pub async fn launch(&self, binary: impl AsRef<Path>) -> Result<u32, ClientError> {
        let binary = binary.as_ref();
        let mut tracked = self.process.lock().await;

        if !tokio::fs::try_exists(binary).await.unwrap_or(false) {
            return Err(ClientError::BinaryNotFound {
                path: binary.to_path_buf(),
            });
        }

        let request = SpawnRequest {
            program: binary.to_path_buf(),
            args: self.flags(),
            uid: identity::effective_uid(),
        };

        let process = self
            .launcher
            .spawn(&request)
            .map_err(|e| ClientError::Spawn {
                path: binary.to_path_buf(),
                source: e,
            })?;
        let pid = process.id();

        if let Some(mut previous) = tracked.replace(process) {
            match previous.try_wait() {
                Ok(Some(status)) => debug!(
                    previous = previous.id(),
                    %status, "Previous daemon process had already exited"
                ),
                _ => warn!(
                    previous = previous.id(),
                    pid, "Replacing tracked daemon process; the previous one is left running"
                ),
            }
        }

        info!(binary = %binary.display(), pid, "Launched daemon");
        Ok(pid)
    }

    /// Pid of the tracked process, if `launch` has been called.
    pub async fn process_id(&self) -> Option<u32> {
        self.process.lock().await.as_ref().map(DaemonProcess::id)
    }

    /// Hand the tracked process to the caller. Afterwards the client behaves
    /// as if attached to an externally managed daemon.
    pub async fn take_process(&self) -> Option<DaemonProcess> {
        self.process.lock().await.take()
    }

    /// Issue a request, merging `request` over the default options.
    ///
    /// Returns the decoded JSON body, or `Value::Null` for an empty body.
    pub async fn call(&self, request: impl Into<ApiRequest>) -> Result<Value, ClientError> {
        let request = request.into();
        let endpoint = request.endpoint.clone();
        let url = self.endpoint_url(&endpoint)?;
        let timeout = request.effective_timeout();

        let _permit = self
            .sockets
            .acquire()
            .await
            .map_err(|_| ClientError::request(&endpoint, None, "connection pool closed"))?;

        debug!(method = %request.method, endpoint = %endpoint, "Daemon API request");

        let mut builder = self
            .http
            .request(request.method, url)
            .timeout(timeout)
            .header(ACCEPT, "application/json");
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(password) = &self.settings.api_password {
            builder = builder.basic_auth("", Some(password.expose()));
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| ClientError::request(&endpoint, None, describe(&e)))?;
        let status = resp.status();
        let body = resp
            .bytes()
            .await
            .map_err(|e| ClientError::request(&endpoint, Some(status.as_u16()), describe(&e)))?;

        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorResponse>(&body)
                .map(|e| e.message)
                .unwrap_or_else(|_| format!("unexpected status: {status}"));
            return Err(ClientError::request(
                endpoint,
                Some(status.as_u16()),
                message,
            ));
        }

        if body.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&body).map_err(|e| {
            ClientError::request(
                endpoint,
                Some(status.as_u16()),
                format!("invalid JSON body: {e}"),
            )
        })
    }

    /// Positional form of [`call`](Self::call).
    pub async fn make_request(
        &self,
        endpoint: &str,
        query: Option<&[(&str, &str)]>,
        method: Method,
        timeout: Duration,
    ) -> Result<Value, ClientError> {
        let mut request = ApiRequest::new(endpoint)
            .with_method(method)
            .with_timeout(timeout);
        for (key, value) in query.unwrap_or_default() {
            request = request.with_query(*key, *value);
        }
        self.call(request).await
    }

    /// `GET /gateway`.
    pub async fn gateway(&self) -> Result<GatewayInfo, ClientError> {
        self.get_typed("/gateway").await
    }

    /// `GET /daemon/version`.
    pub async fn daemon_version(&self) -> Result<DaemonVersion, ClientError> {
        self.get_typed("/daemon/version").await
    }

    /// `GET /daemon/stop`. Asks the daemon to shut down.
    pub async fn daemon_stop(&self) -> Result<(), ClientError> {
        self.make_request("/daemon/stop", None, Method::GET, DEFAULT_CALL_TIMEOUT)
            .await
            .map(|_| ())
    }

    /// Check that the daemon answers.
    ///
    /// With a tracked process the probe is `/daemon/version` and failure is
    /// [`ClientError::ProcessUnresponsive`]. Without one the probe is
    /// `/daemon/stop` and failure is [`ClientError::DaemonUnreachable`].
    /// Note that the second probe asks a reachable daemon to shut down.
    pub async fn is_running(&self) -> Result<(), ClientError> {
        let pid = self.process_id().await;

        match pid {
            Some(pid) => self.daemon_version().await.map(|_| ()).map_err(|e| {
                debug!(pid, error = %e, "Version probe failed");
                ClientError::ProcessUnresponsive { pid }
            }),
            None => self.daemon_stop().await.map_err(|e| {
                debug!(error = %e, "Reachability probe failed");
                ClientError::DaemonUnreachable {
                    url: self.api_base(),
                }
            }),
        }
    }

    /// `http://:<password>@<host>:<port>`, with an empty password segment
    /// when none is configured. Pure; performs no I/O.
    pub fn get_connection_url(&self) -> String {
        let password = self
            .settings
            .api_password
            .as_ref()
            .map(|p| p.expose())
            .unwrap_or("");
        format!(
            "http://:{}@{}:{}",
            password, self.settings.api_host, self.settings.api_port
        )
    }

    async fn get_typed<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ClientError> {
        let value = self
            .make_request(endpoint, None, Method::GET, DEFAULT_CALL_TIMEOUT)
            .await?;
        serde_json::from_value(value)
            .map_err(|e| ClientError::request(endpoint, None, format!("unexpected response: {e}")))
    }

    /// Base URL without credentials; IPv6 hosts are bracketed.
    fn api_base(&self) -> String {
        let host = &self.settings.api_host;
        if host.contains(':') && !host.starts_with('[') {
            format!("http://[{host}]:{}", self.settings.api_port)
        } else {
            format!("http://{host}:{}", self.settings.api_port)
        }
    }

    /// The daemon URL for `endpoint`. The endpoint only ever replaces the
    /// path and query; scheme, host and port always come from the settings.
    fn endpoint_url(&self, endpoint: &str) -> Result<Url, ClientError> {
        let mut url = Url::parse(&self.api_base())
            .map_err(|e| ClientError::request(endpoint, None, format!("invalid URL: {e}")))?;
        let (path, query) = match endpoint.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (endpoint, None),
        };
        url.set_path(path);
        url.set_query(query);
        Ok(url)
    }
}

/// Flatten a reqwest error into a message that names the failure class.
fn describe(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("timed out: {err}")
    } else if err.is_connect() {
        format!("connection failed: {err}")
    } else {
        err.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use siactl_config::{ApiAuthentication, ApiPassword, NoCredentials};

    fn client(config: ClientConfig) -> SiaClient {
        SiaClient::builder(config)
            .credentials(NoCredentials)
            .build()
            .unwrap()
    }

    fn with_password(password: &str) -> ClientConfig {
        ClientConfig {
            api_authentication: Some(ApiAuthentication::Enabled),
            api_authentication_password: Some(ApiPassword::new(password)),
            ..ClientConfig::default()
        }
    }

    #[test]
    fn test_connection_url_defaults() {
        let client = client(ClientConfig::default());
        assert_eq!(client.get_connection_url(), "http://:@localhost:9980");
    }

    #[test]
    fn test_connection_url_with_password() {
        let client = client(with_password("foo"));
        assert_eq!(client.get_connection_url(), "http://:foo@localhost:9980");
    }

    #[test]
    fn test_connection_url_only_credentials_change() {
        let a = client(with_password("one")).get_connection_url();
        let b = client(with_password("two")).get_connection_url();
        let again = client(with_password("one")).get_connection_url();

        assert_eq!(a, again);
        assert_eq!(a.replacen(":one@", ":two@", 1), b);
    }

    #[test]
    fn test_endpoint_url_joins_path() {
        let client = client(ClientConfig {
            api_host: Some("10.0.0.5".to_string()),
            api_port: Some(8000),
            ..ClientConfig::default()
        });
        let url = client.endpoint_url("/daemon/version").unwrap();
        assert_eq!(url.as_str(), "http://10.0.0.5:8000/daemon/version");
    }

    #[test]
    fn test_endpoint_url_never_changes_authority() {
        let client = client(ClientConfig {
            api_host: Some("10.0.0.5".to_string()),
            api_port: Some(8000),
            ..ClientConfig::default()
        });
        for endpoint in [
            "//evil.example/steal",
            "http://evil.example/steal",
            "https://evil.example:443/",
            "consensus",
        ] {
            let url = client.endpoint_url(endpoint).unwrap();
            assert_eq!(url.host_str(), Some("10.0.0.5"), "{endpoint}");
            assert_eq!(url.port(), Some(8000), "{endpoint}");
            assert_eq!(url.scheme(), "http", "{endpoint}");
        }
    }

    #[test]
    fn test_endpoint_url_keeps_inline_query() {
        let client = client(ClientConfig::default());
        let url = client.endpoint_url("/renter/files?limit=5").unwrap();
        assert_eq!(url.path(), "/renter/files");
        assert_eq!(url.query(), Some("limit=5"));
    }

    #[test]
    fn test_endpoint_url_brackets_ipv6() {
        let client = client(ClientConfig {
            api_host: Some("::1".to_string()),
            ..ClientConfig::default()
        });
        let url = client.endpoint_url("/gateway").unwrap();
        assert_eq!(url.as_str(), "http://[::1]:9980/gateway");
    }

    #[test]
    fn test_api_request_builders() {
        let request = ApiRequest::from("/renter/files")
            .with_method(Method::POST)
            .with_query("siapath", "movies")
            .with_timeout(Duration::from_secs(2));
        assert_eq!(request.endpoint, "/renter/files");
        assert_eq!(request.method, Method::POST);
        assert_eq!(
            request.query,
            vec![("siapath".to_string(), "movies".to_string())]
        );
        assert_eq!(request.timeout, Some(Duration::from_secs(2)));
        assert_eq!(request.effective_timeout(), Duration::from_secs(2));
        assert_eq!(ApiRequest::from("/x".to_string()).method, Method::GET);
    }

    #[test]
    fn test_call_without_timeout_uses_thirty_seconds() {
        assert_eq!(
            ApiRequest::new("/consensus").effective_timeout(),
            Duration::from_secs(30)
        );
        assert_eq!(DEFAULT_CALL_TIMEOUT, Duration::from_secs(30));
    }

    #[test]
    fn test_build_rejects_zero_sockets() {
        let result = SiaClient::builder(ClientConfig::default())
            .credentials(NoCredentials)
            .max_sockets(0)
            .build();
        assert!(matches!(result, Err(ClientError::Configuration(_))));
    }

    #[test]
    fn test_build_tolerates_missing_data_directory() {
        let client = client(ClientConfig {
            data_directory: Some("/nonexistent/sia-data".into()),
            ..ClientConfig::default()
        });
        assert!(client.flags().contains(&"--sia-directory=/nonexistent/sia-data".to_string()));
    }

    #[test]
    fn test_build_rejects_invalid_config() {
        let result = SiaClient::builder(ClientConfig {
            api_port: Some(0),
            ..ClientConfig::default()
        })
        .credentials(NoCredentials)
        .build();
        assert!(matches!(result, Err(ClientError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_fresh_client_tracks_no_process() {
        let client = client(ClientConfig::default());
        assert_eq!(client.process_id().await, None);
        assert!(client.take_process().await.is_none());
    }
}
