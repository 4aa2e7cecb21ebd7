//! HTTP access against an in-process mock daemon.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use siactl_config::{ApiAuthentication, ApiPassword, ClientConfig};
use siactl_core::{ApiRequest, ClientError, Method, SiaClient};
use siactl_test_utils::tracing_setup::init_test_tracing;
use siactl_test_utils::{MockDaemon, RecordingLauncher, StaticCredentials, unused_port};
use tempfile::NamedTempFile;

fn client_for(config: ClientConfig) -> SiaClient {
    SiaClient::builder(config)
        .credentials(StaticCredentials::none())
        .launcher(Arc::new(RecordingLauncher::new()))
        .build()
        .unwrap()
}

fn with_password(mut config: ClientConfig, password: &str) -> ClientConfig {
    config.api_authentication = Some(ApiAuthentication::Enabled);
    config.api_authentication_password = Some(ApiPassword::new(password));
    config
}

#[tokio::test]
async fn daemon_version_sends_default_agent() {
    init_test_tracing();
    let daemon = MockDaemon::start().await;
    let client = client_for(daemon.client_config());

    let version = client.daemon_version().await.unwrap();
    assert_eq!(version.version, "1.5.9");
    assert_eq!(version.gitrevision, "deadbeef");

    let requests = daemon.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "GET");
    assert_eq!(requests[0].path, "/daemon/version");
    assert_eq!(requests[0].user_agent.as_deref(), Some("Sia-Agent"));
    assert_eq!(requests[0].authorization, None);
}

#[tokio::test]
async fn configured_agent_overrides_user_agent() {
    let daemon = MockDaemon::start().await;
    let mut config = daemon.client_config();
    config.agent = Some("custom-agent".to_string());
    let client = client_for(config);

    client.gateway().await.unwrap();

    assert_eq!(
        daemon.requests()[0].user_agent.as_deref(),
        Some("custom-agent")
    );
}

#[tokio::test]
async fn password_is_sent_as_basic_auth() {
    let daemon = MockDaemon::builder()
        .require_authorization("Basic OmZvbw==")
        .start()
        .await;
    let client = client_for(with_password(daemon.client_config(), "foo"));

    let gateway = client.gateway().await.unwrap();

    assert_eq!(gateway.netaddress, "127.0.0.1:9981");
    assert_eq!(gateway.peers.len(), 1);
    assert_eq!(
        daemon.requests()[0].authorization.as_deref(),
        Some("Basic OmZvbw==")
    );
}

#[tokio::test]
async fn wrong_password_surfaces_daemon_message() {
    let daemon = MockDaemon::builder()
        .require_authorization("Basic OmZvbw==")
        .start()
        .await;
    let client = client_for(with_password(daemon.client_config(), "bar"));

    let err = client.daemon_version().await.unwrap_err();

    match err {
        ClientError::Request {
            endpoint,
            status,
            message,
        } => {
            assert_eq!(endpoint, "/daemon/version");
            assert_eq!(status, Some(401));
            assert_eq!(message, "API authentication failed.");
        }
        other => panic!("expected request error, got {other:?}"),
    }
}

#[tokio::test]
async fn call_merges_query_method_and_body() {
    let daemon = MockDaemon::start().await;
    let client = client_for(daemon.client_config());

    let request = ApiRequest::new("/renter/upload")
        .with_method(Method::POST)
        .with_query("siapath", "movies/a.mkv")
        .with_json(json!({ "datapieces": 10 }));
    let echoed = client.call(request).await.unwrap();

    assert_eq!(echoed["method"], "POST");
    assert_eq!(echoed["path"], "/renter/upload");
    assert_eq!(echoed["query"], "siapath=movies%2Fa.mkv");
    assert_eq!(echoed["body"], json!({ "datapieces": 10 }));
}

#[tokio::test]
async fn call_accepts_bare_endpoint() {
    let daemon = MockDaemon::start().await;
    let client = client_for(daemon.client_config());

    let echoed = client.call("/consensus").await.unwrap();

    assert_eq!(echoed["method"], "GET");
    assert_eq!(echoed["path"], "/consensus");
}

#[tokio::test]
async fn make_request_with_query() {
    let daemon = MockDaemon::start().await;
    let client = client_for(daemon.client_config());

    client
        .make_request(
            "/wallet/transactions",
            Some(&[("startheight", "0"), ("endheight", "100")]),
            Method::GET,
            Duration::from_secs(5),
        )
        .await
        .unwrap();

    assert_eq!(
        daemon.requests()[0].query.as_deref(),
        Some("startheight=0&endheight=100")
    );
}

#[tokio::test]
async fn non_success_status_is_request_error() {
    let daemon = MockDaemon::start().await;
    let client = client_for(daemon.client_config());

    let err = client.call("/missing").await.unwrap_err();

    assert_eq!(err.status(), Some(404));
    assert!(err.to_string().contains("no such endpoint"));
}

#[tokio::test]
async fn unreachable_daemon_is_request_error() {
    let client = client_for(ClientConfig {
        api_host: Some("127.0.0.1".to_string()),
        api_port: Some(unused_port()),
        ..ClientConfig::default()
    });

    let err = client.daemon_version().await.unwrap_err();

    assert!(matches!(err, ClientError::Request { status: None, .. }));
}

#[tokio::test]
async fn endpoint_cannot_redirect_request_to_another_host() {
    let daemon = MockDaemon::start().await;
    let other = MockDaemon::start().await;
    let client = client_for(with_password(daemon.client_config(), "secret"));

    for endpoint in [
        format!("//127.0.0.1:{}/steal", other.port()),
        format!("http://127.0.0.1:{}/steal", other.port()),
    ] {
        client.call(endpoint).await.unwrap();
    }

    assert_eq!(other.requests(), Vec::new());
    let seen = daemon.requests();
    assert_eq!(seen.len(), 2);
    assert!(seen.iter().all(|r| r.path.ends_with("/steal")));
    assert!(
        seen.iter()
            .all(|r| r.authorization.as_deref() == Some("Basic OnNlY3JldA=="))
    );
}

#[tokio::test]
async fn request_timeout_is_request_error() {
    let daemon = MockDaemon::start().await;
    let client = client_for(daemon.client_config());

    let err = client
        .call(ApiRequest::new("/slow").with_timeout(Duration::from_millis(50)))
        .await
        .unwrap_err();

    match err {
        ClientError::Request {
            endpoint,
            status,
            message,
        } => {
            assert_eq!(endpoint, "/slow");
            assert_eq!(status, None);
            assert!(message.contains("timed out"), "{message}");
        }
        other => panic!("expected request error, got {other:?}"),
    }
}

#[tokio::test]
async fn daemon_stop_accepts_empty_body() {
    let daemon = MockDaemon::start().await;
    let client = client_for(daemon.client_config());

    client.daemon_stop().await.unwrap();

    assert_eq!(daemon.stop_calls(), 1);
}

#[tokio::test]
async fn single_socket_still_serves_concurrent_calls() {
    let daemon = MockDaemon::start().await;
    let client = Arc::new(
        SiaClient::builder(daemon.client_config())
            .credentials(StaticCredentials::none())
            .max_sockets(1)
            .build()
            .unwrap(),
    );

    let mut handles = Vec::new();
    for i in 0..5 {
        let client = Arc::clone(&client);
        handles.push(tokio::spawn(async move {
            client.call(format!("/echo/{i}")).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(daemon.requests().len(), 5);
}

// ── is_running ────────────────────────────────────────────────────────

#[tokio::test]
async fn is_running_with_launched_process_probes_version() {
    let daemon = MockDaemon::start().await;
    let binary = NamedTempFile::new().unwrap();
    let client = client_for(daemon.client_config());
    client.launch(binary.path()).await.unwrap();

    client.is_running().await.unwrap();

    let paths: Vec<_> = daemon.requests().into_iter().map(|r| r.path).collect();
    assert_eq!(paths, vec!["/daemon/version"]);
    assert_eq!(daemon.stop_calls(), 0);
}

#[tokio::test]
async fn is_running_reports_unresponsive_process() {
    let daemon = MockDaemon::builder().fail_version().start().await;
    let binary = NamedTempFile::new().unwrap();
    let client = client_for(daemon.client_config());
    let pid = client.launch(binary.path()).await.unwrap();

    let err = client.is_running().await.unwrap_err();

    assert!(matches!(err, ClientError::ProcessUnresponsive { pid: p } if p == pid));
}

#[tokio::test]
async fn is_running_without_process_probes_stop() {
    let daemon = MockDaemon::start().await;
    let client = client_for(daemon.client_config());

    client.is_running().await.unwrap();

    assert_eq!(daemon.stop_calls(), 1);
}

#[tokio::test]
async fn is_running_after_take_process_probes_stop() {
    let daemon = MockDaemon::start().await;
    let binary = NamedTempFile::new().unwrap();
    let client = client_for(daemon.client_config());
    client.launch(binary.path()).await.unwrap();
    client.take_process().await.unwrap();

    client.is_running().await.unwrap();

    assert_eq!(daemon.stop_calls(), 1);
}

#[tokio::test]
async fn is_running_reports_unreachable_daemon() {
    let port = unused_port();
    let client = client_for(ClientConfig {
        api_host: Some("127.0.0.1".to_string()),
        api_port: Some(port),
        ..ClientConfig::default()
    });

    let err = client.is_running().await.unwrap_err();

    match err {
        ClientError::DaemonUnreachable { url } => {
            assert_eq!(url, format!("http://127.0.0.1:{port}"));
        }
        other => panic!("expected unreachable error, got {other:?}"),
    }
}
