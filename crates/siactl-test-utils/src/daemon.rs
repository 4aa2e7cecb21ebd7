//! In-process mock of the daemon's HTTP API.
//!
//! [`MockDaemon`] binds an axum router to an ephemeral localhost port and
//! serves `/daemon/version`, `/gateway`, and `/daemon/stop`. `/missing`
//! answers 404 and `/slow` waits [`SLOW_RESPONSE_DELAY`] before echoing.
//! Every other path echoes the request back as JSON. All requests are recorded so tests can
//! assert on headers, query strings, and bodies.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::{AUTHORIZATION, HeaderName, USER_AGENT};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use siactl_config::{ApiAuthentication, ClientConfig};

/// Version string reported by the mock.
pub const MOCK_VERSION: &str = "1.5.9";
/// How long `/slow` takes to answer.
pub const SLOW_RESPONSE_DELAY: Duration = Duration::from_secs(2);

/// One request as seen by the mock.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub user_agent: Option<String>,
    pub authorization: Option<String>,
    pub body: Option<Value>,
}

struct MockState {
    requests: Mutex<Vec<RecordedRequest>>,
    authorization: Option<String>,
    version_status: StatusCode,
    stop_calls: AtomicUsize,
}

/// Builder for [`MockDaemon`].
#[derive(Debug, Default)]
pub struct MockDaemonBuilder {
    authorization: Option<String>,
    fail_version: bool,
}

impl MockDaemonBuilder {
    /// Reject requests whose `Authorization` header differs from `header`
    /// (e.g. `"Basic OmZvbw=="` for password `foo`).
    pub fn require_authorization(mut self, header: &str) -> Self {
        self.authorization = Some(header.to_string());
        self
    }

    /// Answer `/daemon/version` with a 500.
    pub fn fail_version(mut self) -> Self {
        self.fail_version = true;
        self
    }

    pub async fn start(self) -> MockDaemon {
        let state = Arc::new(MockState {
            requests: Mutex::new(Vec::new()),
            authorization: self.authorization,
            version_status: if self.fail_version {
                StatusCode::INTERNAL_SERVER_ERROR
            } else {
                StatusCode::OK
            },
            stop_calls: AtomicUsize::new(0),
        });

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind mock daemon");
        let addr = listener.local_addr().expect("mock daemon has no address");

        let app = axum::Router::new()
            .route("/daemon/version", get(handle_version))
            .route("/daemon/stop", get(handle_stop))
            .route("/gateway", get(handle_gateway))
            .fallback(handle_echo)
            .with_state(Arc::clone(&state));

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await;
        });

        MockDaemon {
            addr,
            state,
            shutdown: Some(shutdown_tx),
        }
    }
}

/// A running mock daemon. Shuts down when dropped.
pub struct MockDaemon {
    addr: SocketAddr,
    state: Arc<MockState>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl MockDaemon {
    /// Start a mock that accepts every request.
    pub async fn start() -> Self {
        Self::builder().start().await
    }

    pub fn builder() -> MockDaemonBuilder {
        MockDaemonBuilder::default()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Client config pointing at this mock with authentication disabled.
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            api_host: Some(self.addr.ip().to_string()),
            api_port: Some(self.addr.port()),
            api_authentication: Some(ApiAuthentication::Disabled),
            ..ClientConfig::default()
        }
    }

    /// Snapshot of the recorded requests, oldest first.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state
            .requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn stop_calls(&self) -> usize {
        self.state.stop_calls.load(Ordering::SeqCst)
    }
}

impl Drop for MockDaemon {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// A localhost port with nothing listening on it.
pub fn unused_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("failed to bind probe port");
    listener
        .local_addr()
        .expect("probe port has no address")
        .port()
}

// ── Route handlers ──────────────────────────────────────────────────────

async fn handle_version(
    State(state): State<Arc<MockState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    if let Err(resp) = record(&state, &method, &uri, &headers, &Bytes::new()) {
        return resp;
    }
    if state.version_status != StatusCode::OK {
        return error(state.version_status, "internal error");
    }
    Json(json!({
        "version": MOCK_VERSION,
        "gitrevision": "deadbeef",
        "buildtime": "Thu Jan  1 00:00:00 UTC 1970",
    }))
    .into_response()
}

async fn handle_gateway(
    State(state): State<Arc<MockState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    if let Err(resp) = record(&state, &method, &uri, &headers, &Bytes::new()) {
        return resp;
    }
    Json(json!({
        "netaddress": "127.0.0.1:9981",
        "peers": [
            { "inbound": false, "local": true, "netaddress": "127.0.0.1:9991", "version": "1.5.9" }
        ],
        "maxdownloadspeed": 0,
        "maxuploadspeed": 0,
    }))
    .into_response()
}

async fn handle_stop(
    State(state): State<Arc<MockState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    if let Err(resp) = record(&state, &method, &uri, &headers, &Bytes::new()) {
        return resp;
    }
    state.stop_calls.fetch_add(1, Ordering::SeqCst);
    StatusCode::NO_CONTENT.into_response()
}

async fn handle_echo(
    State(state): State<Arc<MockState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Err(resp) = record(&state, &method, &uri, &headers, &body) {
        return resp;
    }
    match uri.path() {
        "/missing" => return error(StatusCode::NOT_FOUND, "no such endpoint"),
        "/slow" => tokio::time::sleep(SLOW_RESPONSE_DELAY).await,
        _ => {}
    }
    Json(json!({
        "method": method.as_str(),
        "path": uri.path(),
        "query": uri.query(),
        "body": serde_json::from_slice::<Value>(&body).ok(),
    }))
    .into_response()
}

fn record(
    state: &MockState,
    method: &Method,
    uri: &Uri,
    headers: &HeaderMap,
    body: &Bytes,
) -> Result<(), Response> {
    let header = |name: HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let authorization = header(AUTHORIZATION);

    if let Ok(mut requests) = state.requests.lock() {
        requests.push(RecordedRequest {
            method: method.as_str().to_string(),
            path: uri.path().to_string(),
            query: uri.query().map(str::to_string),
            user_agent: header(USER_AGENT),
            authorization: authorization.clone(),
            body: serde_json::from_slice(body).ok(),
        });
    }

    match &state.authorization {
        Some(expected) if authorization.as_ref() != Some(expected) => Err(error(
            StatusCode::UNAUTHORIZED,
            "API authentication failed.",
        )),
        _ => Ok(()),
    }
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}
